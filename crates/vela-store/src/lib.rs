//! # vela-store: Local Data Store for Vela POS
//!
//! This crate owns everything the application persists on a device: the
//! key-value layer, the entity store and its mutators, the audit trail, the
//! session/security manager, and the notification bus.
//!
//! ## Architecture Position
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       Vela POS Data Flow                           │
//! │                                                                    │
//! │  UI command (record sale, login, ...)                              │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  ┌──────────────────────────────────────────────────────────────┐  │
//! │  │                  vela-store (THIS CRATE)                     │  │
//! │  │                                                              │  │
//! │  │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐   │  │
//! │  │  │ EntityStore │  │ SessionMgr   │  │ Notifier           │   │  │
//! │  │  │ (store/)    │  │ (session.rs) │  │ (notify.rs)        │   │  │
//! │  │  │ mutators +  │  │ login/lock/  │  │ auto-expiring      │   │  │
//! │  │  │ audit trail │  │ invites      │  │ toasts             │   │  │
//! │  │  └──────┬──────┘  └──────┬───────┘  └────────────────────┘   │  │
//! │  │         │                │                                   │  │
//! │  │         ▼                ▼                                   │  │
//! │  │  ┌──────────────────────────────────────────────────────┐    │  │
//! │  │  │ storage.rs: obfuscated key-value layer               │    │  │
//! │  │  │ (FileBackend / MemoryBackend behind StorageBackend)  │    │  │
//! │  │  └──────────────────────────────────────────────────────┘    │  │
//! │  └──────────────────────────────────────────────────────────────┘  │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  one file per key under the data directory                         │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`storage`]  - key constants, obfuscation codec, storage backends
//! - [`store`]    - the entity store and its domain mutators
//! - [`session`]  - login, lockout, 2FA, invites, recovery, lock screen
//! - [`password`] - credential primitives (Argon2id, time-window 2FA codes)
//! - [`notify`]   - auto-expiring toast bus
//! - [`error`]    - store error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod notify;
pub mod password;
pub mod session;
pub mod storage;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use notify::{Notifier, Severity, Toast};
pub use session::{
    LoginOutcome, RecoveryProof, RegisterOutcome, Registration, SessionManager, SessionSnapshot,
};
pub use storage::{FileBackend, MemoryBackend, StorageBackend};
pub use store::{
    Actor, CustomerDraft, DatasetSnapshot, EntityStore, OrderDraft, ProductDraft, PurchaseDraft,
    TransactionDraft,
};
