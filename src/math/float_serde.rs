//! Serde helpers for `f64` fields that may hold NaN or infinities.
//!
//! JSON has no spelling for non-finite numbers and `serde_json` writes them as
//! `null`, which then fails to load back into an `f64`. Fields using these
//! helpers write finite values as plain numbers and non-finite ones as the
//! strings `"NaN"`, `"inf"` and `"-inf"`.
//!
//! ```ignore
//! #[serde(with = "crate::math::float_serde")]
//! loss: f64,
//! ```
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde::ser::{Serialize, Serializer};

const NAN: &str = "NaN";
const INF: &str = "inf";
const NEG_INF: &str = "-inf";

/// Accepts either a JSON number or one of the non-finite spellings.
#[derive(Deserialize)]
#[serde(untagged)]
enum FloatRepr {
    Number(f64),
    Text(String),
}

impl FloatRepr {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            FloatRepr::Number(v) => Ok(v),
            FloatRepr::Text(s) => match s.as_str() {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(E::custom(format!("expected a number, found \"{}\"", other))),
            },
        }
    }
}

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str(NAN)
    } else if *value > 0.0 {
        serializer.serialize_str(INF)
    } else {
        serializer.serialize_str(NEG_INF)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    FloatRepr::deserialize(deserializer)?.into_f64()
}

/// Same encoding for `Option<f64>`; `None` stays `null`.
pub mod option {
    use super::*;

    struct Float(f64);

    impl Serialize for Float {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            super::serialize(&self.0, serializer)
        }
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&Float(*v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Option::<FloatRepr>::deserialize(deserializer)?
            .map(FloatRepr::into_f64)
            .transpose()
    }
}
