//! Canonical JSON and blake3 fingerprints
//!
//! Used to prove that two training runs produced the same model and to
//! fingerprint the configuration a model was trained with. Object keys
//! are sorted at every depth and the output carries no whitespace.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("canonical JSON encoding failed: {0}")]
pub struct CanonicalError(#[from] serde_json::Error);

/// Serialize a value to canonical JSON (sorted keys, compact)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let value = sort_keys(serde_json::to_value(value)?);
    Ok(serde_json::to_string(&value)?)
}

/// Hex-encoded blake3 digest of the canonical JSON form
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let json = to_canonical_json(value)?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
