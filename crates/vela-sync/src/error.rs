//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                      Sync Error Categories                         │
//! │                                                                    │
//! │  ┌────────────────┐  ┌─────────────────┐  ┌─────────────────────┐  │
//! │  │ Configuration  │  │   Transport     │  │     Payload         │  │
//! │  │                │  │                 │  │                     │  │
//! │  │  Disabled      │  │  Connection     │  │  Serialization      │  │
//! │  │  InvalidUrl    │  │  Timeout        │  │  Deserialization    │  │
//! │  │                │  │  HttpStatus     │  │  RemoteError        │  │
//! │  └────────────────┘  └─────────────────┘  └─────────────────────┘  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed sync never damages local state: the dataset and its dirty flag
//! stay untouched, and the next scheduler tick simply tries again.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// No endpoint configured; sync is off.
    #[error("Sync is disabled: no endpoint configured")]
    Disabled,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failed to reach the endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// Endpoint answered with a non-success HTTP status.
    #[error("Endpoint returned HTTP {status}")]
    HttpStatus { status: u16 },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// Endpoint answered with an application-level error body.
    #[error("Endpoint error: {0}")]
    RemoteError(String),

    /// Failed to serialize the outgoing payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to decode the incoming payload.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(crate::transport::REQUEST_TIMEOUT_SECS)
        } else if let Some(status) = err.status() {
            SyncError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the next scheduler tick may succeed without any
    /// configuration change.
    ///
    /// ## Retryable
    /// - connection failures, timeouts, transient HTTP statuses
    ///
    /// ## Non-Retryable
    /// - disabled/misconfigured sync, payload corruption, endpoint rejection
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) | SyncError::HttpStatus { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::Disabled | SyncError::InvalidUrl(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_covers_transport_only() {
        assert!(SyncError::ConnectionFailed("refused".into()).is_retryable());
        assert!(SyncError::Timeout(30).is_retryable());
        assert!(SyncError::HttpStatus { status: 503 }.is_retryable());

        assert!(!SyncError::Disabled.is_retryable());
        assert!(!SyncError::RemoteError("bad secret".into()).is_retryable());
        assert!(!SyncError::DeserializationFailed("garbage".into()).is_retryable());
    }

    #[test]
    fn config_errors_are_flagged() {
        assert!(SyncError::Disabled.is_config_error());
        assert!(!SyncError::Timeout(30).is_config_error());
    }
}
