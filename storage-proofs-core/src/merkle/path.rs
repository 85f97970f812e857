use ark_ff::PrimeField;

use crate::poseidon::{FieldHasher, HashError};
use crate::utils::errors::{Result, StorageProofError};

/// Bit `level` of `index`; bits past the width of `u64` are zero.
#[inline]
fn path_bit(index: u64, level: usize) -> u64 {
    index.checked_shr(level as u32).unwrap_or(0) & 1
}

/// Fold `leaf` up through `siblings`.
///
/// Bit `k` of `index` (least significant first) says whether the running node
/// is the right child at level `k`.
pub fn compute_root<F, H>(hasher: &H, leaf: F, index: u64, siblings: &[F]) -> core::result::Result<F, HashError>
where
    F: PrimeField,
    H: FieldHasher<F>,
{
    siblings
        .iter()
        .enumerate()
        .try_fold(leaf, |node, (level, sibling)| {
            if path_bit(index, level) == 0 {
                hasher.hash_pair(node, *sibling)
            } else {
                hasher.hash_pair(*sibling, node)
            }
        })
}

/// Left/right position of the path node at each level (0 = left).
pub fn path_indices(index: u64, depth: usize) -> Vec<u8> {
    (0..depth).map(|level| path_bit(index, level) as u8).collect()
}

/// Root of the smallest tree holding `leaves`, without padding to a fixed
/// depth. A level with an odd number of nodes pairs its last node with itself.
pub fn treehash<F, H>(hasher: &H, leaves: &[F]) -> Result<F>
where
    F: PrimeField,
    H: FieldHasher<F>,
{
    if leaves.is_empty() {
        return Err(StorageProofError::invalid_input("cannot merkelize zero leaves"));
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hasher.hash_pair(pair[0], *pair.get(1).unwrap_or(&pair[0])))
            .collect::<core::result::Result<Vec<F>, _>>()?;
    }
    Ok(level[0])
}
