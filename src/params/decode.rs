//! Text-to-structure normalization of raw parameters.

use serde_json::Value;

/// Decode a raw parameter.
///
/// Text is parsed as JSON; when that fails (or yields `null`) the original text is kept.
/// Structured input passes through unchanged. `None` and `null` are "not present".
pub fn decode_value(raw: Option<&Value>) -> Option<Value> {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Null) | Err(_) => Some(Value::String(text.clone())),
            Ok(decoded) => Some(decoded),
        },
        Some(other) => Some(other.clone()),
    }
}
