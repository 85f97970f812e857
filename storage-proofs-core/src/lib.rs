#![allow(clippy::len_without_is_empty)]
#![allow(clippy::too_long_first_doc_paragraph)]

pub mod backend;
pub mod config;
pub mod dataset;
pub mod digest;
pub mod field;
pub mod membership;
pub mod merkle;
pub mod poseidon;
pub mod utils;
pub mod witness;


pub use backend::{CircuitInputs, ProofArtifacts, ProofBackend, ProveError, StorageProver};
pub use config::StorageConfig;
pub use dataset::{ChunkOpening, CommitmentSummary, DatasetCommitment};
pub use digest::{digest, ChunkDigest};
pub use field::FieldElement;
pub use membership::{MembershipOutcome, MembershipVerifier};
pub use merkle::{compute_root, treehash, IncrementalMerkleTree, MerkleProof};
pub use poseidon::{CircomPoseidon, FieldHasher, HashError};
pub use utils::errors::StorageProofError;
pub use witness::{StorageWitness, WitnessIssue};
