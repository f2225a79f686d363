//! # vela-sync: Cloud Sync Engine for Vela POS
//!
//! Best-effort replication of the whole local dataset through a simple
//! HTTP endpoint. The unit of sync is the entire dataset: pushes upload a
//! timestamped snapshot, pulls download the remote one, and conflicts
//! resolve by last writer wins with a small clock-skew guard.
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Vela POS Sync Flow                         │
//! │                                                                  │
//! │  SyncScheduler (scheduler.rs)                                    │
//! │     every N seconds: push if dirty, else pull                    │
//! │       │                                                          │
//! │       ▼                                                          │
//! │  SyncEngine (engine.rs)                                          │
//! │     snapshot ↔ conflict rule ↔ dirty flag                        │
//! │       │                                                          │
//! │       ▼                                                          │
//! │  RemoteEndpoint (transport.rs)                                   │
//! │     HTTP POST ?action=push / GET ?action=pull, shared secret     │
//! │       │                                                          │
//! │       ▼                                                          │
//! │  SyncEnvelope (payload.rs)                                       │
//! │     base64(JSON { timestamp, data })                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`payload`]   - the base64 envelope codec
//! - [`transport`] - `RemoteEndpoint` trait and the reqwest implementation
//! - [`engine`]    - push/pull with last-writer-wins conflict resolution
//! - [`scheduler`] - periodic background loop with graceful shutdown
//! - [`error`]     - sync error types and retry categorization

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod payload;
pub mod scheduler;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{PullOutcome, SyncEngine, CLOCK_SKEW_GUARD_MS};
pub use error::{SyncError, SyncResult};
pub use payload::SyncEnvelope;
pub use scheduler::{SyncScheduler, SyncSchedulerHandle};
pub use transport::{HttpEndpoint, RemoteEndpoint};
