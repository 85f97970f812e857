//! Field element helpers.
//!
//! Every value handled by the storage proof core lives in a prime field. The
//! BN254 scalar field is the field the storer circuit is compiled over, but all
//! algorithms are generic over [`PrimeField`] so other fields can be plugged in
//! (the modulus is carried by the type, not by a global).
//!
//! Textual and byte conversions reduce modulo the field order, matching how
//! circom witness calculators ingest out-of-range integers.

mod serde_impls;

pub use serde_impls::{serde_decimal, serde_decimal_matrix, serde_decimal_option, serde_decimal_vec};

use ark_ff::{BigInteger, PrimeField};
use num::BigUint;

use crate::utils::errors::{Result, StorageProofError};

/// The BN254 scalar field, the field of the storer circuit.
pub type FieldElement = ark_bn254::Fr;

#[inline]
pub fn from_u64<F: PrimeField>(value: u64) -> F {
    F::from(value)
}

/// One field element per byte.
pub fn elements_from_bytes<F: PrimeField>(bytes: &[u8]) -> Vec<F> {
    bytes.iter().map(|b| F::from(*b as u64)).collect()
}

/// Parse a base-10 integer, reducing it modulo the field order.
pub fn from_decimal_str<F: PrimeField>(text: &str) -> Result<F> {
    parse_radix(text.trim(), 10)
}

/// Parse a base-16 integer (optional `0x` prefix), reducing it modulo the field order.
pub fn from_hex_str<F: PrimeField>(text: &str) -> Result<F> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    parse_radix(digits, 16)
}

fn parse_radix<F: PrimeField>(digits: &str, radix: u32) -> Result<F> {
    if digits.is_empty() {
        return Err(StorageProofError::invalid_input("empty field element literal"));
    }
    let value = BigUint::parse_bytes(digits.as_bytes(), radix).ok_or_else(|| {
        StorageProofError::invalid_input(format!(
            "'{digits}' is not a base-{radix} field element"
        ))
    })?;
    Ok(F::from_be_bytes_mod_order(&value.to_bytes_be()))
}

fn to_biguint<F: PrimeField>(value: &F) -> BigUint {
    BigUint::from_bytes_be(&value.into_bigint().to_bytes_be())
}

pub fn to_decimal_string<F: PrimeField>(value: &F) -> String {
    to_biguint(value).to_str_radix(10)
}

/// Lower-case hex, `0x` prefixed and zero padded to the modulus width.
pub fn to_hex_string<F: PrimeField>(value: &F) -> String {
    let width = (F::MODULUS_BIT_SIZE as usize).div_ceil(8) * 2;
    format!("0x{:0>width$}", to_biguint(value).to_str_radix(16))
}
