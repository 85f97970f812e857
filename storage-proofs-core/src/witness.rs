//! The structured input handed to the proving system.
//!
//! Field names follow the storer circuit's input signals. Chunk hashes are
//! included even though they are derivable from the chunks: the circuit
//! asserts consistency instead of recomputing them a second time.
//!
//! The salt travels as an opaque public input. How the circuit binds it is the
//! circuit's business; the host never folds it into the Merkle path.

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

use common::constants::{
    SIGNAL_CHUNKS, SIGNAL_CHUNK_HASHES, SIGNAL_INDICES, SIGNAL_ROOT, SIGNAL_SALT,
    SIGNAL_TREE_SIBLINGS,
};

use crate::backend::CircuitInputs;
use crate::field::{serde_decimal, serde_decimal_matrix, serde_decimal_option, serde_decimal_vec};
use crate::membership::{ChunkOpening, MembershipOutcome, MembershipVerifier};
use crate::poseidon::FieldHasher;
use crate::utils::errors::{Result, StorageProofError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "", rename_all = "camelCase")]
pub struct StorageWitness<F: PrimeField> {
    #[serde(with = "serde_decimal_matrix")]
    pub chunks: Vec<Vec<F>>,
    #[serde(with = "serde_decimal_vec")]
    pub chunk_hashes: Vec<F>,
    pub indices: Vec<u64>,
    #[serde(with = "serde_decimal_matrix")]
    pub tree_siblings: Vec<Vec<F>>,
    #[serde(with = "serde_decimal")]
    pub root: F,
    #[serde(
        with = "serde_decimal_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub salt: Option<F>,
}

/// Why a witness cannot be handed to the prover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WitnessIssue<F> {
    /// Mismatched or empty signal arrays.
    Shape(String),
    /// Opening `position` does not check out against the root.
    Rejected {
        position: usize,
        index: u64,
        outcome: MembershipOutcome<F>,
    },
}

impl<F: PrimeField> StorageWitness<F> {
    /// Batch `openings` under their common root.
    pub fn from_openings(openings: &[ChunkOpening<F>], salt: Option<F>) -> Result<Self> {
        let first = openings
            .first()
            .ok_or_else(|| StorageProofError::invalid_input("a witness needs at least one opening"))?;
        if let Some(other) = openings.iter().find(|o| o.root != first.root) {
            return Err(StorageProofError::invalid_input(format!(
                "opening of leaf {} is against a different root",
                other.index
            )));
        }

        let witness = Self {
            chunks: openings.iter().map(|o| o.chunk.clone()).collect(),
            chunk_hashes: openings.iter().map(|o| o.chunk_hash).collect(),
            indices: openings.iter().map(|o| o.index).collect(),
            tree_siblings: openings.iter().map(|o| o.siblings.clone()).collect(),
            root: first.root,
            salt,
        };
        witness
            .check_shape()
            .map_err(|issue| StorageProofError::invalid_input(format!("{issue:?}")))?;
        Ok(witness)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn depth(&self) -> usize {
        self.tree_siblings.first().map_or(0, Vec::len)
    }

    /// Split back into per-leaf openings. Assumes a well-shaped witness.
    pub fn openings(&self) -> Vec<ChunkOpening<F>> {
        (0..self.len())
            .map(|i| ChunkOpening {
                chunk: self.chunks[i].clone(),
                chunk_hash: self.chunk_hashes[i],
                index: self.indices[i],
                siblings: self.tree_siblings[i].clone(),
                root: self.root,
            })
            .collect()
    }

    /// Array lengths agree and every opening has the same shape, as the
    /// circuit's fixed signal dimensions require.
    pub fn check_shape(&self) -> core::result::Result<(), WitnessIssue<F>> {
        let n = self.indices.len();
        if n == 0 {
            return Err(WitnessIssue::Shape("no openings".to_string()));
        }
        if self.chunks.len() != n || self.chunk_hashes.len() != n || self.tree_siblings.len() != n
        {
            return Err(WitnessIssue::Shape(format!(
                "{} chunks, {} chunk hashes, {} indices and {} sibling paths",
                self.chunks.len(),
                self.chunk_hashes.len(),
                n,
                self.tree_siblings.len()
            )));
        }
        let block = self.chunks[0].len();
        if let Some(position) = self.chunks.iter().position(|c| c.len() != block) {
            return Err(WitnessIssue::Shape(format!(
                "chunk {position} has {} elements, expected {block}",
                self.chunks[position].len()
            )));
        }
        let depth = self.depth();
        if let Some(position) = self.tree_siblings.iter().position(|s| s.len() != depth) {
            return Err(WitnessIssue::Shape(format!(
                "sibling path {position} has {} entries, expected {depth}",
                self.tree_siblings[position].len()
            )));
        }
        Ok(())
    }

    /// Recompute every chunk hash and path on the host.
    ///
    /// Returns the first problem found, or `None` when the circuit would
    /// accept the witness.
    #[tracing::instrument(skip_all, name = "StorageWitness::check", fields(openings = self.len()))]
    pub fn check<H: FieldHasher<F>>(
        &self,
        verifier: &MembershipVerifier<F, H>,
    ) -> Result<Option<WitnessIssue<F>>> {
        if let Err(issue) = self.check_shape() {
            return Ok(Some(issue));
        }
        let outcomes = verifier.verify_batch(&self.openings())?;
        Ok(outcomes
            .into_iter()
            .enumerate()
            .find(|(_, outcome)| !outcome.is_member())
            .map(|(position, outcome)| WitnessIssue::Rejected {
                position,
                index: self.indices[position],
                outcome,
            }))
    }

    /// Flatten into circuit signals: nested arrays row-major, in the order
    /// chunks, chunkHashes, indices, treeSiblings, root, salt.
    pub fn circuit_inputs(&self) -> CircuitInputs<F> {
        let mut inputs = CircuitInputs::default();
        inputs.push(SIGNAL_CHUNKS, self.chunks.iter().flatten().copied().collect());
        inputs.push(SIGNAL_CHUNK_HASHES, self.chunk_hashes.clone());
        inputs.push(
            SIGNAL_INDICES,
            self.indices.iter().map(|i| F::from(*i)).collect(),
        );
        inputs.push(
            SIGNAL_TREE_SIBLINGS,
            self.tree_siblings.iter().flatten().copied().collect(),
        );
        inputs.push(SIGNAL_ROOT, vec![self.root]);
        if let Some(salt) = self.salt {
            inputs.push(SIGNAL_SALT, vec![salt]);
        }
        inputs
    }
}
