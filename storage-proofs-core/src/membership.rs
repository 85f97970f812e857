//! Stateless membership checks.
//!
//! The verifier never sees the tree: it gets a chunk, the claimed leaf index,
//! the sibling path and a root, and recomputes everything else. This is the
//! same computation the storer circuit enforces.

use ark_ff::PrimeField;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::digest::ChunkDigest;
use crate::field::{serde_decimal, serde_decimal_vec};
use crate::merkle::compute_root;
use crate::poseidon::FieldHasher;
use crate::utils::errors::Result;
use crate::utils::math::index_fits;

/// Result of a membership check that ran to completion.
///
/// Every variant other than [`MembershipOutcome::Member`] is a rejection of
/// the claim, not a failure of the verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipOutcome<F> {
    Member,
    /// The chunk does not digest to the hash the prover claimed for it.
    ChunkHashMismatch { claimed: F, computed: F },
    /// The path folds to a different root.
    RootMismatch { expected: F, computed: F },
    /// The index needs more levels than the path has.
    IndexOutsidePath { index: u64, depth: usize },
}

impl<F> MembershipOutcome<F> {
    pub fn is_member(&self) -> bool {
        matches!(self, MembershipOutcome::Member)
    }
}

/// Everything needed to check one chunk against a root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "", rename_all = "camelCase")]
pub struct ChunkOpening<F: PrimeField> {
    #[serde(with = "serde_decimal_vec")]
    pub chunk: Vec<F>,
    #[serde(with = "serde_decimal")]
    pub chunk_hash: F,
    pub index: u64,
    #[serde(with = "serde_decimal_vec")]
    pub siblings: Vec<F>,
    #[serde(with = "serde_decimal")]
    pub root: F,
}

#[derive(Clone, Debug)]
pub struct MembershipVerifier<F: PrimeField, H: FieldHasher<F>> {
    digest: ChunkDigest<F, H>,
}

impl<F: PrimeField, H: FieldHasher<F>> MembershipVerifier<F, H> {
    pub fn new(hasher: H, chunk_size: usize) -> Result<Self> {
        Ok(Self::from_digest(ChunkDigest::new(hasher, chunk_size)?))
    }

    pub fn from_digest(digest: ChunkDigest<F, H>) -> Self {
        Self { digest }
    }

    pub fn chunk_digest(&self) -> &ChunkDigest<F, H> {
        &self.digest
    }

    /// Check that `chunk` sits at `index` under `expected_root`.
    ///
    /// `Err` is reserved for malformed input (e.g. an empty chunk); a chunk
    /// that is not in the tree yields `Ok` with a rejecting outcome.
    pub fn verify(
        &self,
        chunk: &[F],
        index: u64,
        siblings: &[F],
        expected_root: F,
    ) -> Result<MembershipOutcome<F>> {
        let leaf = self.digest.digest(chunk)?;
        self.verify_leaf(leaf, index, siblings, expected_root)
    }

    /// Like [`Self::verify`] for an already digested chunk.
    pub fn verify_leaf(
        &self,
        leaf: F,
        index: u64,
        siblings: &[F],
        expected_root: F,
    ) -> Result<MembershipOutcome<F>> {
        if !index_fits(index, siblings.len()) {
            tracing::debug!(index, depth = siblings.len(), "rejecting index outside path");
            return Ok(MembershipOutcome::IndexOutsidePath {
                index,
                depth: siblings.len(),
            });
        }

        let computed = compute_root(self.digest.hasher(), leaf, index, siblings)?;
        if computed == expected_root {
            Ok(MembershipOutcome::Member)
        } else {
            tracing::debug!(index, "rejecting chunk, recomputed root differs");
            Ok(MembershipOutcome::RootMismatch {
                expected: expected_root,
                computed,
            })
        }
    }

    pub fn is_member(
        &self,
        chunk: &[F],
        index: u64,
        siblings: &[F],
        expected_root: F,
    ) -> Result<bool> {
        Ok(self.verify(chunk, index, siblings, expected_root)?.is_member())
    }

    /// Check an opening, including the chunk hash it claims.
    pub fn verify_opening(&self, opening: &ChunkOpening<F>) -> Result<MembershipOutcome<F>> {
        let computed = self.digest.digest(&opening.chunk)?;
        if computed != opening.chunk_hash {
            tracing::debug!(index = opening.index, "rejecting chunk, hash differs from claim");
            return Ok(MembershipOutcome::ChunkHashMismatch {
                claimed: opening.chunk_hash,
                computed,
            });
        }
        self.verify_leaf(computed, opening.index, &opening.siblings, opening.root)
    }

    /// Check every opening; outcomes are returned in input order.
    #[tracing::instrument(skip_all, name = "MembershipVerifier::verify_batch", fields(openings = openings.len()))]
    pub fn verify_batch(&self, openings: &[ChunkOpening<F>]) -> Result<Vec<MembershipOutcome<F>>> {
        #[cfg(feature = "parallel")]
        let outcomes = openings
            .par_iter()
            .map(|opening| self.verify_opening(opening))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes = openings
            .iter()
            .map(|opening| self.verify_opening(opening))
            .collect();

        outcomes
    }
}
