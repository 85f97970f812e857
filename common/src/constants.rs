/// Number of field elements hashed together by the first digest level.
pub const DEFAULT_CHUNK_SIZE: usize = 5;
/// Tree depth used by the storer circuit (2^21 leaves).
pub const DEFAULT_TREE_DEPTH: usize = 21;
/// Bytes per dataset block; every byte becomes one field element.
pub const DEFAULT_BLOCK_SIZE: usize = 32;
pub const MIN_TREE_DEPTH: usize = 1;
pub const MAX_TREE_DEPTH: usize = 32;
/// Only binary trees are supported by the storer circuit.
pub const TREE_ARITY: usize = 2;
/// Widest circom Poseidon instance (t = 13).
pub const POSEIDON_MAX_INPUTS: usize = 12;

// Circuit signal names.
pub const SIGNAL_CHUNKS: &str = "chunks";
pub const SIGNAL_CHUNK_HASHES: &str = "chunkHashes";
pub const SIGNAL_INDICES: &str = "indices";
pub const SIGNAL_TREE_SIBLINGS: &str = "treeSiblings";
pub const SIGNAL_ROOT: &str = "root";
pub const SIGNAL_SALT: &str = "salt";
