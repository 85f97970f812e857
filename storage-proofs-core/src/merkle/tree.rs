use ark_ff::PrimeField;
use once_cell::sync::OnceCell;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use common::constants::{MAX_TREE_DEPTH, MIN_TREE_DEPTH, TREE_ARITY};

use super::proof::MerkleProof;
use crate::poseidon::{FieldHasher, HashError};
use crate::utils::errors::{Result, StorageProofError};
use crate::utils::math::Math;

/// An append-only binary Merkle tree of fixed depth.
///
/// Unfilled leaf slots hold `zero_value`; an all-zero subtree of height `k`
/// is `zeroes[k]`, so the empty tree's root is `zeroes[depth]`. Only the leaves
/// are stored. Internal levels are derived from them on the first query after
/// an insert and cached until the next insert.
pub struct IncrementalMerkleTree<F: PrimeField, H: FieldHasher<F>> {
    hasher: H,
    depth: usize,
    zeroes: Vec<F>,
    leaves: Vec<F>,
    levels: OnceCell<Vec<Vec<F>>>,
}

impl<F: PrimeField, H: FieldHasher<F>> IncrementalMerkleTree<F, H> {
    pub fn new(hasher: H, depth: usize, zero_value: F) -> Result<Self> {
        Self::with_arity(hasher, depth, zero_value, TREE_ARITY)
    }

    /// Only arity 2 is supported; any other arity is a configuration error.
    #[tracing::instrument(skip_all, name = "IncrementalMerkleTree::new")]
    pub fn with_arity(hasher: H, depth: usize, zero_value: F, arity: usize) -> Result<Self> {
        if arity != TREE_ARITY {
            return Err(StorageProofError::config(format!(
                "tree arity must be {TREE_ARITY}, got {arity}"
            )));
        }
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
            return Err(StorageProofError::config(format!(
                "tree depth must be between {MIN_TREE_DEPTH} and {MAX_TREE_DEPTH}, got {depth}"
            )));
        }

        let mut zeroes = Vec::with_capacity(depth + 1);
        zeroes.push(zero_value);
        for level in 0..depth {
            let below = zeroes[level];
            zeroes.push(hasher.hash_pair(below, below)?);
        }

        Ok(Self {
            hasher,
            depth,
            zeroes,
            leaves: Vec::new(),
            levels: OnceCell::new(),
        })
    }

    /// Build a tree holding `leaves` in order.
    pub fn from_leaves(hasher: H, depth: usize, zero_value: F, leaves: &[F]) -> Result<Self> {
        let mut tree = Self::new(hasher, depth, zero_value)?;
        if leaves.len() as u64 > tree.capacity() {
            return Err(StorageProofError::config(format!(
                "{} leaves do not fit a depth {depth} tree ({} slots)",
                leaves.len(),
                tree.capacity()
            )));
        }
        tree.leaves.extend_from_slice(leaves);
        Ok(tree)
    }

    /// Append a leaf. A full tree is left untouched.
    pub fn insert(&mut self, leaf: F) -> Result<()> {
        if self.len() >= self.capacity() {
            return Err(StorageProofError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.leaves.push(leaf);
        self.levels.take();
        Ok(())
    }

    pub fn root(&self) -> Result<F> {
        if self.leaves.is_empty() {
            return Ok(self.zeroes[self.depth]);
        }
        Ok(self.levels()?[self.depth][0])
    }

    /// Open the leaf at `index` against the current root.
    #[tracing::instrument(skip_all, name = "IncrementalMerkleTree::create_proof")]
    pub fn create_proof(&self, index: u64) -> Result<MerkleProof<F>> {
        if index >= self.len() {
            return Err(StorageProofError::IndexOutOfRange {
                index,
                leaves: self.len(),
            });
        }

        let levels = self.levels()?;
        let mut position = index as usize;
        let siblings = (0..self.depth)
            .map(|level| {
                let sibling = levels[level]
                    .get(position ^ 1)
                    .copied()
                    .unwrap_or(self.zeroes[level]);
                position >>= 1;
                sibling
            })
            .collect();

        Ok(MerkleProof {
            leaf: self.leaves[index as usize],
            index,
            siblings,
            root: levels[self.depth][0],
        })
    }

    /// Recompute `proof`'s root with this tree's hasher. Proofs of another
    /// depth are rejected. Pure, never fails.
    pub fn verify_proof(&self, proof: &MerkleProof<F>) -> bool {
        if proof.depth() != self.depth {
            tracing::debug!(
                expected = self.depth,
                got = proof.depth(),
                "proof depth does not match tree"
            );
            return false;
        }
        proof.verify(&self.hasher)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Number of leaf slots, `2^depth`.
    pub fn capacity(&self) -> u64 {
        self.depth.pow2()
    }

    pub fn leaves(&self) -> &[F] {
        &self.leaves
    }

    pub fn leaf(&self, index: u64) -> Option<F> {
        self.leaves.get(usize::try_from(index).ok()?).copied()
    }

    pub fn zero_value(&self) -> F {
        self.zeroes[0]
    }

    /// Roots of all-zero subtrees, indexed by height.
    pub fn zeroes(&self) -> &[F] {
        &self.zeroes
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    fn levels(&self) -> Result<&Vec<Vec<F>>> {
        self.levels.get_or_try_init(|| {
            build_levels(&self.hasher, &self.leaves, &self.zeroes, self.depth)
                .map_err(StorageProofError::from)
        })
    }
}

/// Every level from the leaves (index 0) to the root (index `depth`). Level
/// `k` holds only the nodes with at least one leaf below them.
#[tracing::instrument(skip_all, name = "merkle::build_levels", fields(leaves = leaves.len()))]
fn build_levels<F: PrimeField, H: FieldHasher<F>>(
    hasher: &H,
    leaves: &[F],
    zeroes: &[F],
    depth: usize,
) -> core::result::Result<Vec<Vec<F>>, HashError> {
    let mut levels = Vec::with_capacity(depth + 1);
    levels.push(leaves.to_vec());
    for level in 0..depth {
        let next = hash_level(hasher, &levels[level], zeroes[level])?;
        levels.push(next);
    }
    Ok(levels)
}

fn hash_level<F: PrimeField, H: FieldHasher<F>>(
    hasher: &H,
    nodes: &[F],
    zero: F,
) -> core::result::Result<Vec<F>, HashError> {
    let parent = |pair: &[F]| hasher.hash_pair(pair[0], pair.get(1).copied().unwrap_or(zero));

    #[cfg(feature = "parallel")]
    let parents = nodes.par_chunks(2).map(parent).collect();
    #[cfg(not(feature = "parallel"))]
    let parents = nodes.chunks(2).map(parent).collect();

    parents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;
    use crate::merkle::{compute_root, treehash};
    use crate::poseidon::testing::PowerSumHasher;
    use crate::poseidon::CircomPoseidon;
    use ark_ff::Zero;
    use ark_std::{test_rng, UniformRand};

    type F = FieldElement;

    fn tree_of(depth: usize, leaves: &[u64]) -> IncrementalMerkleTree<F, CircomPoseidon> {
        let mut tree = IncrementalMerkleTree::new(CircomPoseidon, depth, F::zero()).unwrap();
        for leaf in leaves {
            tree.insert(F::from(*leaf)).unwrap();
        }
        tree
    }

    #[test]
    fn four_leaf_scenario() {
        let tree = tree_of(2, &[1, 2, 3, 4]);
        let proof = tree.create_proof(0).unwrap();
        assert_eq!(proof.siblings.len(), 2);
        assert_eq!(proof.leaf, F::from(1u64));
        assert!(tree.verify_proof(&proof));

        let leaves: Vec<F> = (1..=4u64).map(F::from).collect();
        assert_eq!(proof.root, treehash(&CircomPoseidon, &leaves).unwrap());

        let mut flipped = proof.clone();
        flipped.siblings[0] += F::from(1u64);
        assert!(!tree.verify_proof(&flipped));
    }

    #[test]
    fn deep_tree_pads_with_zero_subtrees() {
        let h = CircomPoseidon;
        let tree = tree_of(21, &[1, 2, 3, 4]);
        let proof = tree.create_proof(2).unwrap();
        assert_eq!(proof.siblings.len(), 21);
        assert!(tree.verify_proof(&proof));

        assert_eq!(proof.siblings[0], F::from(4u64));
        assert_eq!(
            proof.siblings[1],
            h.hash_pair(F::from(1u64), F::from(2u64)).unwrap()
        );
        // everything above the populated subtree is a zero subtree
        for level in 2..21 {
            assert_eq!(proof.siblings[level], tree.zeroes()[level]);
        }
    }

    #[test]
    fn empty_tree_root_is_zero_chain() {
        let h = CircomPoseidon;
        let tree = tree_of(3, &[]);
        let mut expected = F::zero();
        for _ in 0..3 {
            expected = h.hash_pair(expected, expected).unwrap();
        }
        assert_eq!(tree.root().unwrap(), expected);
        assert!(tree.is_empty());
        assert!(matches!(
            tree.create_proof(0),
            Err(StorageProofError::IndexOutOfRange { index: 0, leaves: 0 })
        ));
    }

    #[test]
    fn every_leaf_opens_for_partial_trees() {
        let mut rng = test_rng();
        for count in [1usize, 2, 3, 5, 8] {
            let leaves: Vec<F> = (0..count).map(|_| F::rand(&mut rng)).collect();
            let tree =
                IncrementalMerkleTree::from_leaves(CircomPoseidon, 3, F::zero(), &leaves).unwrap();
            let root = tree.root().unwrap();
            for index in 0..count as u64 {
                let proof = tree.create_proof(index).unwrap();
                assert_eq!(proof.root, root);
                assert_eq!(proof.leaf, leaves[index as usize]);
                assert!(tree.verify_proof(&proof), "count {count} index {index}");
            }
        }
    }

    #[test]
    fn insert_invalidates_cached_levels() {
        let mut tree = tree_of(4, &[1, 2, 3]);
        let before = tree.root().unwrap();
        let stale = tree.create_proof(0).unwrap();
        tree.insert(F::from(4u64)).unwrap();

        let after = tree.root().unwrap();
        assert_ne!(before, after);
        let fresh = tree.create_proof(0).unwrap();
        assert_eq!(fresh.root, after);
        // the old opening still verifies against the root it carries
        assert!(tree.verify_proof(&stale));
        assert_ne!(stale.siblings, fresh.siblings);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut tree = tree_of(1, &[7, 8]);
        let root = tree.root().unwrap();
        assert!(matches!(
            tree.insert(F::from(9u64)),
            Err(StorageProofError::CapacityExceeded { capacity: 2 })
        ));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root().unwrap(), root);

        let leaves = vec![F::from(1u64); 5];
        assert!(matches!(
            IncrementalMerkleTree::from_leaves(CircomPoseidon, 2, F::zero(), &leaves),
            Err(StorageProofError::Config(_))
        ));
    }

    #[test]
    fn rejects_bad_configuration() {
        let config_err = |r: Result<IncrementalMerkleTree<F, CircomPoseidon>>| {
            matches!(r, Err(StorageProofError::Config(_)))
        };
        assert!(config_err(IncrementalMerkleTree::new(CircomPoseidon, 0, F::zero())));
        assert!(config_err(IncrementalMerkleTree::new(CircomPoseidon, 33, F::zero())));
        assert!(config_err(IncrementalMerkleTree::with_arity(
            CircomPoseidon,
            4,
            F::zero(),
            3
        )));
    }

    #[test]
    fn verify_rejects_wrong_depth() {
        let tree = tree_of(3, &[1, 2]);
        let mut proof = tree.create_proof(1).unwrap();
        proof.siblings.pop();
        assert!(!tree.verify_proof(&proof));
    }

    #[test]
    fn nonzero_zero_value() {
        let h = CircomPoseidon;
        let zero = F::from(99u64);
        let mut tree = IncrementalMerkleTree::new(h, 2, zero).unwrap();
        tree.insert(F::from(1u64)).unwrap();
        let proof = tree.create_proof(0).unwrap();
        assert_eq!(proof.siblings[0], zero);
        assert_eq!(proof.siblings[1], h.hash_pair(zero, zero).unwrap());
        assert_eq!(
            compute_root(&h, proof.leaf, 0, &proof.siblings).unwrap(),
            tree.root().unwrap()
        );
    }

    #[test]
    fn concurrent_readers_share_a_frozen_tree() {
        let mut rng = test_rng();
        let leaves: Vec<F> = (0..16).map(|_| F::rand(&mut rng)).collect();
        let tree = IncrementalMerkleTree::from_leaves(CircomPoseidon, 5, F::zero(), &leaves).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4u64)
                .map(|t| {
                    let tree = &tree;
                    s.spawn(move || {
                        (t * 4..t * 4 + 4)
                            .all(|i| tree.verify_proof(&tree.create_proof(i).unwrap()))
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap());
            }
        });
    }

    #[test]
    fn generic_over_the_field() {
        use ark_bn254::Fq;
        let leaves: Vec<Fq> = (1..=3u64).map(Fq::from).collect();
        let tree = IncrementalMerkleTree::from_leaves(PowerSumHasher, 2, Fq::zero(), &leaves).unwrap();
        for index in 0..3 {
            assert!(tree.verify_proof(&tree.create_proof(index).unwrap()));
        }
    }
}
