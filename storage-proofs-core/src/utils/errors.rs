use thiserror::Error;

use crate::poseidon::HashError;

/// Structural failures of the storage proof core.
///
/// A root mismatch is deliberately absent: it is an expected verification
/// outcome and is reported through [`crate::MembershipOutcome`].
#[derive(Error, Debug)]
pub enum StorageProofError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Tree is full, capacity {capacity} leaves")]
    CapacityExceeded { capacity: u64 },
    #[error("Leaf {index} does not exist, tree holds {leaves} leaves")]
    IndexOutOfRange { index: u64, leaves: u64 },
    #[error("Hash failed: {0}")]
    Hash(#[from] HashError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] ark_serialize::SerializationError),
}

impl StorageProofError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = core::result::Result<T, StorageProofError>;
