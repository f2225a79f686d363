//! # vela-core: Pure Business Logic for Vela POS
//!
//! This crate is the heart of the Vela POS data core. It contains the domain
//! model and the pure business rules, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Vela POS Data Core                            │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                ★ vela-core (THIS CRATE) ★                   │   │
//! │  │                                                             │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌───────────┐                │   │
//! │  │   │  types   │  │ sequence │  │   error   │                │   │
//! │  │   │ Product  │  │ next id  │  │ CoreError │                │   │
//! │  │   │ Customer │  │ counters │  │  variants │                │   │
//! │  │   └──────────┘  └──────────┘  └───────────┘                │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │              vela-store (persisted entity store)            │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │              vela-sync (cloud snapshot sync)                │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

pub mod error;
pub mod sequence;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use sequence::next_sequence;
pub use types::*;

/// Acting identity recorded on audit entries when no user session exists
/// (startup migrations, scheduled sync, seed tooling).
pub const SYSTEM_USER_ID: &str = "system";

/// Number of consecutive failed logins before an account is locked out.
pub const MAX_FAILED_LOGINS: u32 = 5;

/// Lockout duration after too many failed logins.
pub const LOCKOUT_MINUTES: i64 = 15;
