//! The hash primitive behind chunk digests and Merkle nodes.
//!
//! [`CircomPoseidon`] is circomlib's Poseidon over the BN254 scalar field (x^5
//! S-box, circom round constants and MDS matrices), so every digest and node
//! computed here matches what the storer circuit recomputes in-circuit.

use std::cell::RefCell;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher};
use thiserror::Error;

use common::constants::POSEIDON_MAX_INPUTS;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Hash input must contain at least one element")]
    EmptyInput,
    #[error("Hash takes at most {max} inputs, got {inputs}")]
    TooManyInputs { inputs: usize, max: usize },
    #[error("Poseidon failure: {0}")]
    Poseidon(#[from] PoseidonError),
}

/// A variable-arity hash over a prime field.
///
/// Implementations must be deterministic. One hasher is shared by concurrent
/// readers of a tree, hence `Send + Sync`.
pub trait FieldHasher<F: PrimeField>: Send + Sync {
    fn hash(&self, inputs: &[F]) -> Result<F, HashError>;

    /// Largest accepted input length.
    fn max_inputs(&self) -> usize;

    /// The two-to-one compression used for Merkle nodes.
    fn hash_pair(&self, left: F, right: F) -> Result<F, HashError> {
        self.hash(&[left, right])
    }
}

impl<F: PrimeField, H: FieldHasher<F>> FieldHasher<F> for &H {
    fn hash(&self, inputs: &[F]) -> Result<F, HashError> {
        (**self).hash(inputs)
    }

    fn max_inputs(&self) -> usize {
        (**self).max_inputs()
    }
}

thread_local! {
    /// One sponge per arity; `hash` leaves the sponge state empty.
    static CIRCOM_SPONGES: RefCell<Vec<Option<Poseidon<Fr>>>> =
        RefCell::new((0..POSEIDON_MAX_INPUTS).map(|_| None).collect());
}

/// circomlib-compatible Poseidon for 1 to 12 inputs.
///
/// Round constants are loaded once per arity and thread, then reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CircomPoseidon;

impl FieldHasher<Fr> for CircomPoseidon {
    fn hash(&self, inputs: &[Fr]) -> Result<Fr, HashError> {
        check_arity(inputs.len(), POSEIDON_MAX_INPUTS)?;
        CIRCOM_SPONGES.with(|sponges| -> Result<Fr, HashError> {
            let mut sponges = sponges.borrow_mut();
            let slot = &mut sponges[inputs.len() - 1];
            let mut poseidon = match slot.take() {
                Some(poseidon) => poseidon,
                None => Poseidon::<Fr>::new_circom(inputs.len())?,
            };
            let digest = poseidon.hash(inputs);
            *slot = Some(poseidon);
            Ok(digest?)
        })
    }

    fn max_inputs(&self) -> usize {
        POSEIDON_MAX_INPUTS
    }
}

pub(crate) fn check_arity(inputs: usize, max: usize) -> Result<(), HashError> {
    if inputs == 0 {
        return Err(HashError::EmptyInput);
    }
    if inputs > max {
        return Err(HashError::TooManyInputs { inputs, max });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::from_hex_str;

    fn fr(v: u64) -> Fr {
        Fr::from(v)
    }

    fn hex(s: &str) -> Fr {
        from_hex_str(s).unwrap()
    }

    #[test]
    fn matches_circomlib_vectors() {
        let h = CircomPoseidon;
        assert_eq!(
            h.hash(&[fr(0)]).unwrap(),
            hex("0x2a09a9fd93c590c26b91effbb2499f07e8f7aa12e2b4940a3aed2411cb65e11c")
        );
        assert_eq!(
            h.hash(&[fr(0), fr(0)]).unwrap(),
            hex("0x2098f5fb9e239eab3ceac3f27b81e481dc3124d55ffed523a839ee8446b64864")
        );
        assert_eq!(
            h.hash(&[fr(0), fr(0), fr(0)]).unwrap(),
            hex("0x0bc188d27dcceadc1dcfb6af0a7af08fe2864eecec96c5ae7cee6db31ba599aa")
        );
        assert_eq!(
            h.hash(&[fr(31213), fr(132)]).unwrap(),
            hex("0x303f59cd0831b5633bcda50514521b33776b5d4280eb5868ba1dbbe2e4d76ab5")
        );
        assert_eq!(
            h.hash_pair(fr(1), fr(2)).unwrap(),
            hex("0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a")
        );
    }

    #[test]
    fn arity_bounds() {
        let h = CircomPoseidon;
        assert!(matches!(h.hash(&[]), Err(HashError::EmptyInput)));
        let wide = vec![fr(1); POSEIDON_MAX_INPUTS];
        assert!(h.hash(&wide).is_ok());
        let too_wide = vec![fr(1); POSEIDON_MAX_INPUTS + 1];
        assert!(matches!(
            h.hash(&too_wide),
            Err(HashError::TooManyInputs { inputs, max })
                if inputs == POSEIDON_MAX_INPUTS + 1 && max == POSEIDON_MAX_INPUTS
        ));
    }

    #[test]
    fn cached_sponges_give_stable_results() {
        let h = CircomPoseidon;
        let pair = hex("0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a");
        let single = hex("0x2a09a9fd93c590c26b91effbb2499f07e8f7aa12e2b4940a3aed2411cb65e11c");
        for _ in 0..3 {
            assert_eq!(h.hash_pair(fr(1), fr(2)).unwrap(), pair);
            assert_eq!(h.hash(&[fr(0)]).unwrap(), single);
        }

        std::thread::scope(|s| {
            let workers: Vec<_> = (0..4)
                .map(|_| s.spawn(move || h.hash_pair(fr(1), fr(2)).unwrap()))
                .collect();
            for worker in workers {
                assert_eq!(worker.join().unwrap(), pair);
            }
        });
    }

    #[test]
    fn order_matters() {
        let h = CircomPoseidon;
        assert_ne!(
            h.hash_pair(fr(1), fr(2)).unwrap(),
            h.hash_pair(fr(2), fr(1)).unwrap()
        );
    }
}
