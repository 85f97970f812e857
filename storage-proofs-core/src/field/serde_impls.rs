//! `#[serde(with = ...)]` adapters writing field elements as decimal strings.
//!
//! Small integers written as JSON numbers are accepted on input, which is how
//! hand-written circom input files usually encode indices and test vectors.

use ark_ff::PrimeField;
use serde::{Deserialize, Deserializer, Serializer};

use super::{from_decimal_str, to_decimal_string};

#[derive(Deserialize)]
#[serde(untagged)]
enum Literal {
    Text(String),
    Number(u64),
}

impl Literal {
    fn into_field<F: PrimeField, E: serde::de::Error>(self) -> Result<F, E> {
        match self {
            Literal::Text(text) => from_decimal_str(&text).map_err(E::custom),
            Literal::Number(n) => Ok(F::from(n)),
        }
    }
}

pub mod serde_decimal {
    use super::*;

    pub fn serialize<F: PrimeField, S: Serializer>(value: &F, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_decimal_string(value))
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(d: D) -> Result<F, D::Error> {
        Literal::deserialize(d)?.into_field()
    }
}

pub mod serde_decimal_option {
    use super::*;

    pub fn serialize<F: PrimeField, S: Serializer>(
        value: &Option<F>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_some(&to_decimal_string(v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<F>, D::Error> {
        Option::<Literal>::deserialize(d)?
            .map(Literal::into_field)
            .transpose()
    }
}

pub mod serde_decimal_vec {
    use super::*;

    pub fn serialize<F: PrimeField, S: Serializer>(values: &[F], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(to_decimal_string))
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<F>, D::Error> {
        Vec::<Literal>::deserialize(d)?
            .into_iter()
            .map(Literal::into_field)
            .collect()
    }
}

pub mod serde_decimal_matrix {
    use super::*;

    pub fn serialize<F: PrimeField, S: Serializer>(
        rows: &[Vec<F>],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_seq(
            rows.iter()
                .map(|row| row.iter().map(to_decimal_string).collect::<Vec<_>>()),
        )
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<Vec<F>>, D::Error> {
        Vec::<Vec<Literal>>::deserialize(d)?
            .into_iter()
            .map(|row| row.into_iter().map(Literal::into_field).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::field::FieldElement;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Signals {
        #[serde(with = "super::serde_decimal")]
        root: FieldElement,
        #[serde(with = "super::serde_decimal_matrix")]
        chunks: Vec<Vec<FieldElement>>,
        #[serde(with = "super::serde_decimal_option", default)]
        salt: Option<FieldElement>,
    }

    #[test]
    fn decimal_strings_on_the_wire() {
        let signals = Signals {
            root: FieldElement::from(7u64),
            chunks: vec![vec![FieldElement::from(1u64), FieldElement::from(2u64)]],
            salt: None,
        };
        let json = serde_json::to_string(&signals).unwrap();
        assert_eq!(json, r#"{"root":"7","chunks":[["1","2"]],"salt":null}"#);
    }

    #[test]
    fn numbers_and_missing_salt_are_accepted() {
        let parsed: Signals = serde_json::from_str(r#"{"root":7,"chunks":[[1,"2"]]}"#).unwrap();
        assert_eq!(parsed.root, FieldElement::from(7u64));
        assert_eq!(parsed.chunks[0][1], FieldElement::from(2u64));
        assert_eq!(parsed.salt, None);

        assert!(serde_json::from_str::<Signals>(r#"{"root":"x","chunks":[]}"#).is_err());
    }
}
