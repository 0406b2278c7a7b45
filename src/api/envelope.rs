//! Payload envelope handling.
//!
//! Proxying layers may deliver a payload as `{"body": "<stringified JSON>"}`
//! instead of the raw object. [`decode_payload`] accepts either, trying the
//! raw shape first. Clients use the same helper to read a `ProcessingResult`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("Invalid JSON payload: {0}")]
    Json(String),

    #[error("Invalid payload: {0}")]
    Shape(String),
}

/// Decode `bytes` as `T`, falling back to the `body` field of a wrapper.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EnvelopeError> {
    let raw_err = match serde_json::from_slice::<T>(bytes) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let value: Value = serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Json(e.to_string()))?;
    match value.get("body") {
        Some(Value::String(inner)) => {
            serde_json::from_str(inner).map_err(|e| EnvelopeError::Shape(format!("body: {e}")))
        }
        Some(inner @ Value::Object(_)) => {
            T::deserialize(inner).map_err(|e| EnvelopeError::Shape(format!("body: {e}")))
        }
        _ => Err(EnvelopeError::Shape(raw_err.to_string())),
    }
}
