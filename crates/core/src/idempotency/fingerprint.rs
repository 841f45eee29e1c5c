//! Request fingerprints.
//!
//! `sha256("<operation>:<canonical json>")` in lowercase hex, where the
//! canonical form has every object's keys sorted.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::error::IdempotencyError;
use super::types::OperationType;

/// Fingerprints a typed request for `operation`.
pub fn fingerprint<T: Serialize>(operation: OperationType, request: &T) -> Result<String, IdempotencyError> {
    let value = serde_json::to_value(request).map_err(|e| IdempotencyError::Payload(e.to_string()))?;
    let canonical = canonicalize(value).to_string();

    let digest = Sha256::new()
        .chain_update(operation.as_str().as_bytes())
        .chain_update(b":")
        .chain_update(canonical.as_bytes())
        .finalize();

    Ok(format!("{digest:x}"))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
