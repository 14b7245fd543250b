//! Shared-secret signatures for inbound webhook payloads.
//!
//! The signed message is every field except `signature`, ordered by field
//! name, with the values' text concatenated without delimiters and the raw
//! secret appended. The signature is the lowercase hex SHA-256 of that
//! message.
//!
//! Booleans render as `True`/`False` and null as `None`, which is how
//! existing senders stringify them.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const SIGNATURE_FIELD: &str = "signature";

/// Text form of a scalar field. `None` for values that cannot be signed.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".into()),
        Value::Bool(false) => Some("False".into()),
        Value::Null => Some("None".into()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// The message the sender signs, before the secret is appended.
pub fn canonical_message(fields: &Map<String, Value>) -> Option<String> {
    let mut names: Vec<&String> = fields.keys().filter(|k| *k != SIGNATURE_FIELD).collect();
    names.sort();

    let mut message = String::new();
    for name in names {
        message.push_str(&scalar_text(&fields[name.as_str()])?);
    }
    Some(message)
}

/// Computes the expected signature for `fields`.
pub fn sign(fields: &Map<String, Value>, secret: &str) -> Option<String> {
    let mut message = canonical_message(fields)?;
    message.push_str(secret);
    Some(hex::encode(Sha256::digest(message.as_bytes())))
}

/// Checks the `signature` field of `fields` against `secret`.
pub fn verify(fields: &Map<String, Value>, secret: &str) -> bool {
    let Some(claimed) = fields.get(SIGNATURE_FIELD).and_then(Value::as_str) else {
        return false;
    };
    let Some(expected) = sign(fields, secret) else {
        return false;
    };
    claimed.as_bytes().ct_eq(expected.as_bytes()).into()
}
