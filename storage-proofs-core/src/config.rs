//! Parameters shared by the host and the storer circuit.
//!
//! A mismatch between the two does not surface as a type error, only as roots
//! that never match, so the config is validated up front.

use std::path::Path;

use serde::{Deserialize, Serialize};

use common::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_TREE_DEPTH, MAX_TREE_DEPTH, MIN_TREE_DEPTH,
    POSEIDON_MAX_INPUTS,
};
use common::serializable::Serializable;

use crate::field::{serde_decimal, FieldElement};
use crate::utils::errors::{Result, StorageProofError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// Levels below the root; the dataset holds at most `2^depth` blocks.
    pub depth: usize,
    /// Elements per first-level digest group.
    pub chunk_size: usize,
    /// Bytes per dataset block (one field element per byte).
    pub block_size: usize,
    /// Value of unfilled leaf slots.
    #[serde(with = "serde_decimal")]
    pub zero_value: FieldElement,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TREE_DEPTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            zero_value: FieldElement::from(0u64),
        }
    }
}

impl StorageConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::deserialize_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&self.depth) {
            return Err(StorageProofError::config(format!(
                "depth must be between {MIN_TREE_DEPTH} and {MAX_TREE_DEPTH}, got {}",
                self.depth
            )));
        }
        if self.chunk_size == 0 || self.chunk_size > POSEIDON_MAX_INPUTS {
            return Err(StorageProofError::config(format!(
                "chunk size must be between 1 and {POSEIDON_MAX_INPUTS}, got {}",
                self.chunk_size
            )));
        }
        if self.block_size == 0 || self.block_size > self.max_block_size() {
            return Err(StorageProofError::config(format!(
                "block size must be between 1 and {} for chunk size {}, got {}",
                self.max_block_size(),
                self.chunk_size,
                self.block_size
            )));
        }
        Ok(())
    }

    /// Largest block the two-level digest can absorb.
    pub fn max_block_size(&self) -> usize {
        self.chunk_size * POSEIDON_MAX_INPUTS
    }
}
