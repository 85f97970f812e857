//! Two-level chunk digest.
//!
//! The input is cut into groups of `chunk_size` elements, the last group is
//! right-padded with zeros, and every group is hashed on its own. A single
//! group hash is the digest; otherwise the group hashes are hashed once more.
//! Both levels use the same bounded-arity hash, which keeps the construction
//! expressible as a fixed-shape circuit.

use std::marker::PhantomData;

use ark_ff::PrimeField;

use common::constants::DEFAULT_CHUNK_SIZE;

use crate::poseidon::FieldHasher;
use crate::utils::errors::{Result, StorageProofError};

/// Reduce `elements` to one field element.
pub fn digest<F, H>(hasher: &H, elements: &[F], chunk_size: usize) -> Result<F>
where
    F: PrimeField,
    H: FieldHasher<F>,
{
    check_shape(hasher.max_inputs(), elements.len(), chunk_size)?;

    let group_hashes = groups(elements, chunk_size)?
        .map(|group| hasher.hash(&group))
        .collect::<core::result::Result<Vec<F>, _>>()?;

    match group_hashes.as_slice() {
        [single] => Ok(*single),
        many => Ok(hasher.hash(many)?),
    }
}

/// The zero-padded groups hashed by the first digest level.
pub fn groups<F: PrimeField>(
    elements: &[F],
    chunk_size: usize,
) -> Result<impl Iterator<Item = Vec<F>> + '_> {
    if chunk_size == 0 {
        return Err(StorageProofError::invalid_input("chunk size must be positive"));
    }
    Ok(elements
        .chunks(chunk_size)
        .map(move |group| pad_group(group, chunk_size)))
}

/// Right-pad `group` with zeros up to `chunk_size` elements.
pub fn pad_group<F: PrimeField>(group: &[F], chunk_size: usize) -> Vec<F> {
    let mut padded = group.to_vec();
    if padded.len() < chunk_size {
        padded.resize(chunk_size, F::zero());
    }
    padded
}

fn check_shape(max_inputs: usize, len: usize, chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(StorageProofError::invalid_input("chunk size must be positive"));
    }
    if chunk_size > max_inputs {
        return Err(StorageProofError::invalid_input(format!(
            "chunk size {chunk_size} exceeds the hash arity {max_inputs}"
        )));
    }
    if len == 0 {
        return Err(StorageProofError::invalid_input("cannot digest an empty chunk"));
    }
    let group_count = len.div_ceil(chunk_size);
    if group_count > max_inputs {
        return Err(StorageProofError::invalid_input(format!(
            "{len} elements form {group_count} groups of {chunk_size}, the hash takes at most {max_inputs}"
        )));
    }
    Ok(())
}

/// A hasher bound to a validated chunk size.
#[derive(Clone, Debug)]
pub struct ChunkDigest<F: PrimeField, H: FieldHasher<F>> {
    hasher: H,
    chunk_size: usize,
    _marker: PhantomData<F>,
}

impl<F: PrimeField, H: FieldHasher<F>> ChunkDigest<F, H> {
    pub fn new(hasher: H, chunk_size: usize) -> Result<Self> {
        // A one-element chunk is the smallest shape a chunk size must admit.
        check_shape(hasher.max_inputs(), 1, chunk_size)?;
        Ok(Self {
            hasher,
            chunk_size,
            _marker: PhantomData,
        })
    }

    pub fn with_default_chunk_size(hasher: H) -> Result<Self> {
        Self::new(hasher, DEFAULT_CHUNK_SIZE)
    }

    pub fn digest(&self, elements: &[F]) -> Result<F> {
        digest(&self.hasher, elements, self.chunk_size)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Longest chunk this digest accepts.
    pub fn max_elements(&self) -> usize {
        self.chunk_size * self.hasher.max_inputs()
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }
}
