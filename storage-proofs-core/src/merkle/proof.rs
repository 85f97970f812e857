use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};

use super::path::{compute_root, path_indices};
use crate::field::{serde_decimal, serde_decimal_vec};
use crate::poseidon::FieldHasher;
use crate::utils::math::index_fits;

/// An opening of one leaf: the leaf, its position and the sibling of the path
/// node at every level, bottom-up.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, CanonicalSerialize, CanonicalDeserialize,
)]
#[serde(bound = "")]
pub struct MerkleProof<F: PrimeField> {
    #[serde(with = "serde_decimal")]
    pub leaf: F,
    pub index: u64,
    #[serde(with = "serde_decimal_vec")]
    pub siblings: Vec<F>,
    #[serde(with = "serde_decimal")]
    pub root: F,
}

impl<F: PrimeField> MerkleProof<F> {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    pub fn path_indices(&self) -> Vec<u8> {
        path_indices(self.index, self.depth())
    }

    /// Recompute the root from the leaf and compare it with `self.root`.
    ///
    /// Never fails: malformed proofs and hash errors are rejections.
    pub fn verify<H: FieldHasher<F>>(&self, hasher: &H) -> bool {
        if !index_fits(self.index, self.depth()) {
            tracing::debug!(index = self.index, depth = self.depth(), "index does not fit the path");
            return false;
        }
        match compute_root(hasher, self.leaf, self.index, &self.siblings) {
            Ok(root) => root == self.root,
            Err(err) => {
                tracing::warn!(%err, "hash failed while folding a Merkle path");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;
    use crate::poseidon::CircomPoseidon;

    type F = FieldElement;

    fn two_level_proof() -> MerkleProof<F> {
        let h = CircomPoseidon;
        let leaves: Vec<F> = (1..=4u64).map(F::from).collect();
        let right = h.hash_pair(leaves[2], leaves[3]).unwrap();
        let root = h
            .hash_pair(h.hash_pair(leaves[0], leaves[1]).unwrap(), right)
            .unwrap();
        MerkleProof {
            leaf: leaves[1],
            index: 1,
            siblings: vec![leaves[0], right],
            root,
        }
    }

    #[test]
    fn verifies_and_rejects_tampering() {
        let h = CircomPoseidon;
        let proof = two_level_proof();
        assert!(proof.verify(&h));
        assert_eq!(proof.path_indices(), vec![1, 0]);

        let mut bad_index = proof.clone();
        bad_index.index = 0;
        assert!(!bad_index.verify(&h));

        let mut out_of_range = proof.clone();
        out_of_range.index = 5;
        assert!(!out_of_range.verify(&h));

        let mut bad_leaf = proof;
        bad_leaf.leaf += F::from(1u64);
        assert!(!bad_leaf.verify(&h));
    }

    #[test]
    fn json_uses_decimal_strings() {
        let proof = MerkleProof {
            leaf: F::from(5u64),
            index: 3,
            siblings: vec![F::from(6u64)],
            root: F::from(7u64),
        };
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"leaf": "5", "index": 3, "siblings": ["6"], "root": "7"})
        );
        let back: MerkleProof<F> = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }

    #[test]
    fn canonical_bytes_round_trip() {
        let proof = two_level_proof();
        let mut bytes = Vec::new();
        proof.serialize_compressed(&mut bytes).unwrap();
        let back = MerkleProof::<F>::deserialize_compressed(bytes.as_slice()).unwrap();
        assert_eq!(back, proof);
    }
}
