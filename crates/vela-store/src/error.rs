//! # Store Error Types
//!
//! Error types for entity store mutations and persistence.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  CoreError (business rule)   io / serde (persistence)               │
//! │       │                            │                                │
//! │       ▼                            ▼                                │
//! │  StoreError (this module) ← adds entity context                     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Caller surfaces a user-facing message / notification               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation failures are returned, never panicked; persistence failures at
//! load time are swallowed into defaults and never reach this type (see
//! `storage::decode_value`).

use thiserror::Error;
use vela_core::CoreError;

/// Entity store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found in its collection.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Username collides case-insensitively with an existing account.
    #[error("Username '{username}' already exists")]
    DuplicateUsername { username: String },

    /// A credit sale was attempted without a customer account.
    #[error("A customer account is required for credit sales")]
    CustomerRequired,

    /// Credit sale pushed a bounded customer over their limit while
    /// enforcement is on.
    #[error("Credit limit exceeded for customer {customer}: requested {requested_cents}, available {available_cents}")]
    CreditLimitExceeded {
        customer: String,
        requested_cents: i64,
        available_cents: i64,
    },

    /// Operation on a transaction that is already cancelled.
    #[error("Transaction {id} is cancelled")]
    TransactionCancelled { id: String },

    /// The current session is not allowed to perform the action.
    #[error("Permission denied: {action}")]
    PermissionDenied { action: &'static str },

    /// Value could not be serialized for persistence.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Backend write failed. Mutations treat this as best-effort and only
    /// log it; the error surfaces for direct backend users (seed tooling).
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Password hashing failed.
    #[error("Hashing failed: {0}")]
    Hashing(String),

    /// Business rule violation from vela-core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        let err = StoreError::not_found("Product", "42");
        assert_eq!(err.to_string(), "Product not found: 42");
    }

    #[test]
    fn core_errors_pass_through() {
        let err: StoreError = CoreError::NegativeAmount {
            field: "amount",
            value: -1,
        }
        .into();
        assert!(matches!(err, StoreError::Core(_)));
    }
}
