//! Committing a byte dataset.
//!
//! Bytes are cut into `block_size` blocks, each byte becomes one field
//! element, the final block is zero-filled to full size (the circuit takes
//! fixed-shape blocks), and the block digests become the tree leaves in order.

use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::digest::ChunkDigest;
use crate::field::{elements_from_bytes, serde_decimal, FieldElement};
use crate::membership::MembershipVerifier;
use crate::merkle::{IncrementalMerkleTree, MerkleProof};
use crate::poseidon::FieldHasher;
use crate::utils::errors::{Result, StorageProofError};

pub use crate::membership::ChunkOpening;

/// Public description of a committed dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentSummary {
    #[serde(with = "serde_decimal")]
    pub root: FieldElement,
    pub leaves: u64,
    pub data_len: u64,
    pub config: StorageConfig,
}

/// A dataset, its blocks and the tree over their digests.
pub struct DatasetCommitment<H: FieldHasher<FieldElement>> {
    config: StorageConfig,
    digest: ChunkDigest<FieldElement, H>,
    blocks: Vec<Vec<FieldElement>>,
    tree: IncrementalMerkleTree<FieldElement, H>,
    data_len: u64,
}

impl<H: FieldHasher<FieldElement> + Clone> DatasetCommitment<H> {
    #[tracing::instrument(skip_all, name = "DatasetCommitment::commit", fields(bytes = data.len()))]
    pub fn commit(hasher: H, config: &StorageConfig, data: &[u8]) -> Result<Self> {
        config.validate()?;
        if data.is_empty() {
            return Err(StorageProofError::invalid_input("cannot commit an empty dataset"));
        }

        let digest = ChunkDigest::new(hasher.clone(), config.chunk_size)?;
        let blocks = split_blocks(data, config.block_size);
        let leaves = blocks
            .iter()
            .map(|block| digest.digest(block))
            .collect::<Result<Vec<_>>>()?;
        let tree =
            IncrementalMerkleTree::from_leaves(hasher, config.depth, config.zero_value, &leaves)?;

        let commitment = Self {
            config: config.clone(),
            digest,
            blocks,
            tree,
            data_len: data.len() as u64,
        };
        tracing::info!(
            leaves = commitment.tree.len(),
            depth = config.depth,
            "committed dataset"
        );
        Ok(commitment)
    }

    pub fn root(&self) -> Result<FieldElement> {
        self.tree.root()
    }

    /// Open block `index` against the current root.
    pub fn open(&self, index: u64) -> Result<ChunkOpening<FieldElement>> {
        let MerkleProof {
            leaf,
            index,
            siblings,
            root,
        } = self.tree.create_proof(index)?;
        Ok(ChunkOpening {
            chunk: self.blocks[index as usize].clone(),
            chunk_hash: leaf,
            index,
            siblings,
            root,
        })
    }

    pub fn summary(&self) -> Result<CommitmentSummary> {
        Ok(CommitmentSummary {
            root: self.root()?,
            leaves: self.tree.len(),
            data_len: self.data_len,
            config: self.config.clone(),
        })
    }

    /// A verifier with the same digest parameters as this commitment.
    pub fn verifier(&self) -> MembershipVerifier<FieldElement, H> {
        MembershipVerifier::from_digest(self.digest.clone())
    }

    pub fn tree(&self) -> &IncrementalMerkleTree<FieldElement, H> {
        &self.tree
    }

    pub fn blocks(&self) -> &[Vec<FieldElement>] {
        &self.blocks
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

fn split_blocks(data: &[u8], block_size: usize) -> Vec<Vec<FieldElement>> {
    data.chunks(block_size)
        .map(|block| {
            let mut elements = elements_from_bytes(block);
            elements.resize(block_size, FieldElement::from(0u64));
            elements
        })
        .collect()
}
