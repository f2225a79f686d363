//! # Error Types
//!
//! Domain errors for vela-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  vela-core errors (this file)                                       │
//! │  └── CoreError    - business rule violations                        │
//! │                                                                     │
//! │  vela-store errors (separate crate)                                 │
//! │  └── StoreError   - mutation/persistence failures                   │
//! │                                                                     │
//! │  vela-sync errors (separate crate)                                  │
//! │  └── SyncError    - transport/protocol failures                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Errors are enum variants with context fields, never bare strings, and
//! validation failures surface as `Err` values rather than panics.

use thiserror::Error;

use crate::types::OrderStatus;

/// Core business rule violations.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// A monetary amount or quantity that must be non-negative was not.
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },

    /// A payment exceeding the outstanding balance of an active transaction.
    #[error("Payment of {amount_cents} exceeds outstanding balance {outstanding_cents}")]
    PaymentExceedsBalance {
        amount_cents: i64,
        outstanding_cents: i64,
    },

    /// An order status transition that violates the monotonic-forward rule.
    #[error("Order status cannot move from {from:?} to {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },
}

/// Convenience alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
