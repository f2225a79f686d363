//! # Persistent Key-Value Layer
//!
//! Obfuscated encode/decode of JSON-serializable values to/from a
//! string-keyed local store. Every other component reads and writes through
//! this layer.
//!
//! ## Store Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  key            │  value                                            │
//! │  ───────────────┼────────────────────────────────────────────────── │
//! │  products       │  vx1:<base64 of JSON array>                       │
//! │  transactions   │  vx1:<base64 of JSON array>                       │
//! │  ...            │  one key per collection (see [`keys`])            │
//! │  settings       │  vx1:<base64 of JSON object>                      │
//! │  currentUser    │  vx1:<base64 of JSON object>  (session scope)     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The obfuscation transform (fixed prefix + base64) only discourages casual
//! inspection of the on-disk files. It is reversible and NOT a security
//! boundary.
//!
//! ## Failure Policy
//! - Load: a missing, corrupt, or undecodable value yields `None`; callers
//!   fall back to a safe default so the application stays usable.
//! - Save: best-effort. Mutators log a failed write and carry on.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::StoreResult;

// =============================================================================
// Store Keys
// =============================================================================

/// String keys of the persisted store, one per collection plus the settings
/// singleton and the session record. The session manager writes only
/// `currentUser`; the entity store owns every other key.
pub mod keys {
    pub const PRODUCTS: &str = "products";
    pub const TRANSACTIONS: &str = "transactions";
    pub const CUSTOMERS: &str = "customers";
    pub const SUPPLIERS: &str = "suppliers";
    pub const CASH_MOVEMENTS: &str = "cashMovements";
    pub const ORDERS: &str = "orders";
    pub const PURCHASES: &str = "purchases";
    pub const USERS: &str = "users";
    pub const USER_INVITES: &str = "userInvites";
    pub const CATEGORIES: &str = "categories";
    pub const ACTIVITY_LOGS: &str = "activityLogs";
    pub const SETTINGS: &str = "settings";
    pub const CURRENT_USER: &str = "currentUser";
    pub const INCOMING_ORDER: &str = "incomingOrder";
}

// =============================================================================
// Obfuscation Codec
// =============================================================================

/// Marker prefix for obfuscated values.
const OBFUSCATION_PREFIX: &str = "vx1:";

/// Encodes a value as an obfuscated store string.
pub fn encode_value<T: Serialize>(value: &T) -> StoreResult<String> {
    let json = serde_json::to_string(value)?;
    Ok(format!("{OBFUSCATION_PREFIX}{}", BASE64.encode(json)))
}

/// Decodes a store string back into a value.
///
/// Accepts both obfuscated values and legacy raw JSON. Returns `None` on any
/// corruption so the caller can substitute a default.
pub fn decode_value<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let json = match raw.strip_prefix(OBFUSCATION_PREFIX) {
        Some(encoded) => {
            let bytes = BASE64.decode(encoded).ok()?;
            String::from_utf8(bytes).ok()?
        }
        None => raw.to_string(),
    };

    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Discarding corrupt stored value");
            None
        }
    }
}

// =============================================================================
// Storage Backend
// =============================================================================

/// A string-keyed local value store.
///
/// Implementations must be cheap to share behind an `Arc`; the entity store
/// and the session manager hold clones of the same backend, each writing its
/// own key scope.
pub trait StorageBackend: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn load(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key` from the store. Missing keys are not an error.
    fn remove(&self, key: &str);
}

// =============================================================================
// File Backend
// =============================================================================

/// File-per-key backend under a data directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Opens (creating if necessary) a data directory.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(FileBackend { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.dat"))
    }
}

impl StorageBackend for FileBackend {
    fn load(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}

// =============================================================================
// Memory Backend
// =============================================================================

/// In-memory backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().expect("backend poisoned").get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values
            .lock()
            .expect("backend poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.values.lock().expect("backend poisoned").remove(key);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_is_identity() {
        let value = vec!["a".to_string(), "b".to_string()];
        let encoded = encode_value(&value).unwrap();
        let decoded: Vec<String> = decode_value(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn encoded_values_carry_the_prefix() {
        let encoded = encode_value(&42u32).unwrap();
        assert!(encoded.starts_with("vx1:"));
        // The payload itself is not plainly readable.
        assert!(!encoded.contains("42"));
    }

    #[test]
    fn raw_json_values_still_decode() {
        let decoded: Vec<u32> = decode_value("[1,2,3]").unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn corrupt_values_decode_to_none() {
        assert!(decode_value::<Vec<u32>>("vx1:not-base64!!").is_none());
        assert!(decode_value::<Vec<u32>>("{truncated").is_none());
    }

    #[test]
    fn memory_backend_round_trips() {
        let backend = MemoryBackend::new();
        assert!(backend.load("products").is_none());

        backend.save("products", "payload").unwrap();
        assert_eq!(backend.load("products").as_deref(), Some("payload"));

        backend.remove("products");
        assert!(backend.load("products").is_none());
    }

    #[test]
    fn file_backend_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        backend.save(keys::SETTINGS, "vx1:abc").unwrap();
        assert_eq!(backend.load(keys::SETTINGS).as_deref(), Some("vx1:abc"));

        // A second backend over the same directory sees the value.
        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.load(keys::SETTINGS).as_deref(), Some("vx1:abc"));

        reopened.remove(keys::SETTINGS);
        assert!(backend.load(keys::SETTINGS).is_none());
    }
}
