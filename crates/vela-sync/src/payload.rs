//! # Sync Payload Envelope
//!
//! The wire shape carried by both push and pull:
//! ```text
//! base64( JSON { "timestamp": <unix millis>, "data": <dataset snapshot> } )
//! ```
//! The timestamp is the sender's wall clock at serialization time; the
//! engine compares it against the local last-update time to resolve
//! conflicts (last writer wins).
//!
//! Pull responses in the wild come in three shapes, all accepted here:
//! a base64 string (optionally JSON-quoted), a raw envelope object, and an
//! `{"status":"error","message":...}` rejection body.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use vela_store::DatasetSnapshot;

use crate::error::{SyncError, SyncResult};

/// A timestamped full-dataset payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEnvelope {
    /// Sender wall clock, unix milliseconds.
    pub timestamp: i64,
    pub data: DatasetSnapshot,
}

/// Encodes an envelope into the base64 wire string.
pub fn encode_envelope(envelope: &SyncEnvelope) -> SyncResult<String> {
    let json = serde_json::to_string(envelope)?;
    Ok(BASE64.encode(json))
}

/// Decodes a pull response body into an envelope.
///
/// Accepts a base64 payload, a raw JSON envelope, or a JSON-quoted base64
/// string; recognises `{"status":"error"}` rejection bodies.
pub fn decode_pull_body(body: &str) -> SyncResult<SyncEnvelope> {
    let trimmed = body.trim();

    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| SyncError::DeserializationFailed(e.to_string()))?;
        if let Some(err) = remote_error(&value) {
            return Err(err);
        }
        // `{"payload": ...}` wrapper: the inner value is either the base64
        // string or the envelope itself.
        if let Some(payload) = value.get("payload") {
            return match payload {
                serde_json::Value::String(inner) => decode_pull_body(inner),
                other => serde_json::from_value(other.clone())
                    .map_err(|e| SyncError::DeserializationFailed(e.to_string())),
            };
        }
        return serde_json::from_value(value)
            .map_err(|e| SyncError::DeserializationFailed(e.to_string()));
    }

    // Strip JSON string quoting if the server double-encoded.
    let encoded = trimmed.trim_matches('"');
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| SyncError::DeserializationFailed(format!("invalid base64: {e}")))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| SyncError::DeserializationFailed(format!("invalid utf-8: {e}")))?;

    let value: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| SyncError::DeserializationFailed(e.to_string()))?;
    if let Some(err) = remote_error(&value) {
        return Err(err);
    }
    serde_json::from_value(value).map_err(|e| SyncError::DeserializationFailed(e.to_string()))
}

/// Detects an `{"status":"error","message":...}` rejection body.
pub fn remote_error(value: &serde_json::Value) -> Option<SyncError> {
    if value.get("status").and_then(|s| s.as_str()) == Some("error") {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unspecified endpoint error");
        return Some(SyncError::RemoteError(message.to_string()));
    }
    None
}
