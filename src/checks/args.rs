//! Conversion of loosely typed catalog arguments into typed check fields.
//!
//! Catalog authors write train numbers, codes and table cells unquoted, so
//! YAML hands us integers where the checks compare strings. Every scalar is
//! accepted and normalised to its string form.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

use crate::tasks::CatalogError;

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Str(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

pub(crate) fn scalar<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Scalar::deserialize(d).map(String::from)
}

pub(crate) fn optional_scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Option::<Scalar>::deserialize(d).map(|value| value.map(String::from))
}

pub(crate) fn scalar_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Vec::<Scalar>::deserialize(d).map(|values| values.into_iter().map(String::from).collect())
}

pub(crate) fn scalar_rows<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<String>>, D::Error> {
    Vec::<Vec<Scalar>>::deserialize(d).map(|rows| {
        rows.into_iter()
            .map(|row| row.into_iter().map(String::from).collect())
            .collect()
    })
}

/// Deserialize a check's keyword arguments, reporting problems against `kind`.
pub(crate) fn parse<T: DeserializeOwned>(kind: &str, args: Mapping) -> Result<T, CatalogError> {
    serde_yaml::from_value(Value::Mapping(args)).map_err(|e| CatalogError::InvalidArgs {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}
