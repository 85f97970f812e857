//! Binary Merkle commitments over field elements.

mod path;
mod proof;
mod tree;

pub use path::{compute_root, path_indices, treehash};
pub use proof::MerkleProof;
pub use tree::IncrementalMerkleTree;
