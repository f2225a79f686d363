//! # Sync Engine
//!
//! Push/pull of the full dataset against the cloud endpoint, with
//! last-writer-wins conflict resolution.
//!
//! ## Conflict Rule
//! ```text
//! pull (not forced):
//!   dirty && last_local_update + 10s skew guard > remote timestamp
//!     → abort the pull and push instead   (local writer is newer)
//!   otherwise
//!     → apply the remote snapshot wholesale
//!
//! pull (forced):
//!   → always apply the remote snapshot wholesale
//! ```
//! The 10 second guard absorbs clock skew between devices; within it, the
//! local copy is treated as the newer writer.
//!
//! ## Failure Policy
//! A failed push or pull leaves the dataset and its dirty flag untouched,
//! raises a toast on the notification bus, and waits for the next tick.
//! `is_syncing` is advisory: it lets callers skip overlapping manual syncs,
//! it does not lock anything.
//!
//! ## Lock Discipline
//! The store lock is taken only to snapshot, to evaluate the conflict rule
//! and to apply; every network await runs without it, so mutators stay live
//! for the whole round trip. A write that lands mid-sync simply keeps the
//! dirty flag and goes up on the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use vela_core::CloudSettings;
use vela_store::{EntityStore, Severity};

use crate::error::{SyncError, SyncResult};
use crate::payload::{decode_pull_body, encode_envelope, SyncEnvelope};
use crate::transport::{HttpEndpoint, RemoteEndpoint};

/// Clock-skew guard for the conflict rule, in milliseconds.
pub const CLOCK_SKEW_GUARD_MS: i64 = 10_000;

/// What a pull actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote snapshot was applied wholesale.
    Applied,
    /// Local changes were newer; the pull was aborted and a push ran
    /// instead.
    PushedLocal,
}

pub struct SyncEngine {
    endpoint: Arc<dyn RemoteEndpoint>,
    is_syncing: AtomicBool,
    last_sync: StdMutex<Option<DateTime<Utc>>>,
}

impl SyncEngine {
    pub fn new(endpoint: Arc<dyn RemoteEndpoint>) -> Self {
        SyncEngine {
            endpoint,
            is_syncing: AtomicBool::new(false),
            last_sync: StdMutex::new(None),
        }
    }

    /// Builds the engine from the cloud settings, or reports sync disabled.
    pub fn from_settings(settings: &CloudSettings) -> SyncResult<Self> {
        let endpoint = settings.endpoint.as_deref().ok_or(SyncError::Disabled)?;
        let http = HttpEndpoint::new(endpoint, settings.secret.clone())?;
        Ok(SyncEngine::new(Arc::new(http)))
    }

    /// Advisory: true while a push or pull is in flight.
    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    /// Wall-clock time of the last successful sync in this process.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.lock().expect("last_sync poisoned")
    }

    // =========================================================================
    // Push
    // =========================================================================

    /// Uploads the full local snapshot. The dirty flag clears only on
    /// confirmed success.
    pub async fn push(&self, store: &Mutex<EntityStore>) -> SyncResult<()> {
        let _guard = self.begin();
        self.do_push(store).await
    }

    async fn do_push(&self, store: &Mutex<EntityStore>) -> SyncResult<()> {
        // Snapshot under a short lock; the upload itself runs unlocked.
        let (data, snapshot_marker) = {
            let store = store.lock().await;
            (store.snapshot(), store.last_local_update())
        };
        let envelope = SyncEnvelope {
            timestamp: Utc::now().timestamp_millis(),
            data,
        };
        let payload = encode_envelope(&envelope)?;

        match self.endpoint.push(&payload).await {
            Ok(()) => {
                let mut store = store.lock().await;
                // A write that landed mid-upload is not in what went up;
                // leave it dirty for the next tick.
                if store.last_local_update() == snapshot_marker {
                    store.mark_synced();
                }
                self.record_sync();
                info!(bytes = payload.len(), "Pushed local snapshot");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Push failed");
                store
                    .lock()
                    .await
                    .notifier()
                    .notify("Sync failed", e.to_string(), Severity::Error);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Pull
    // =========================================================================

    /// Downloads the remote snapshot and applies the conflict rule.
    ///
    /// The fetch runs without the store lock: a mutation can land between
    /// the fetch and the apply, and the conflict rule is evaluated against
    /// whatever state exists once the body arrives.
    pub async fn pull(&self, store: &Mutex<EntityStore>, force: bool) -> SyncResult<PullOutcome> {
        let _guard = self.begin();

        let body = match self.endpoint.pull().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Pull failed");
                store
                    .lock()
                    .await
                    .notifier()
                    .notify("Sync failed", e.to_string(), Severity::Error);
                return Err(e);
            }
        };
        let envelope = match decode_pull_body(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Pull payload rejected");
                store
                    .lock()
                    .await
                    .notifier()
                    .notify("Sync failed", e.to_string(), Severity::Error);
                return Err(e);
            }
        };

        let mut locked = store.lock().await;
        let local_ms = locked.last_local_update().timestamp_millis();
        if !force && locked.is_dirty() && local_ms + CLOCK_SKEW_GUARD_MS > envelope.timestamp {
            drop(locked);
            info!(
                local_ms,
                remote_ms = envelope.timestamp,
                "Local changes newer than remote, pushing instead"
            );
            self.do_push(store).await?;
            return Ok(PullOutcome::PushedLocal);
        }

        locked.apply_remote(envelope.data);
        drop(locked);
        self.record_sync();
        info!(remote_ms = envelope.timestamp, "Applied remote snapshot");
        Ok(PullOutcome::Applied)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn record_sync(&self) {
        *self.last_sync.lock().expect("last_sync poisoned") = Some(Utc::now());
    }

    fn begin(&self) -> SyncingGuard<'_> {
        self.is_syncing.store(true, Ordering::SeqCst);
        SyncingGuard(&self.is_syncing)
    }
}

struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vela_store::{DatasetSnapshot, MemoryBackend, Notifier, StorageBackend};

    #[derive(Default)]
    struct MockEndpoint {
        pushed: StdMutex<Vec<String>>,
        pull_body: StdMutex<Option<String>>,
        fail_push: AtomicBool,
        fail_pull: AtomicBool,
    }

    impl MockEndpoint {
        fn serve(&self, envelope: &SyncEnvelope) {
            *self.pull_body.lock().unwrap() = Some(encode_envelope(envelope).unwrap());
        }

        fn push_count(&self) -> usize {
            self.pushed.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteEndpoint for MockEndpoint {
        async fn push(&self, payload: &str) -> SyncResult<()> {
            if self.fail_push.load(Ordering::SeqCst) {
                return Err(SyncError::ConnectionFailed("mock down".into()));
            }
            self.pushed.lock().unwrap().push(payload.to_string());
            Ok(())
        }

        async fn pull(&self) -> SyncResult<String> {
            if self.fail_pull.load(Ordering::SeqCst) {
                return Err(SyncError::ConnectionFailed("mock down".into()));
            }
            self.pull_body
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| SyncError::RemoteError("no payload".into()))
        }
    }

    fn store() -> Mutex<EntityStore> {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        Mutex::new(EntityStore::open(backend, Notifier::new()))
    }

    fn remote_envelope(timestamp: i64) -> SyncEnvelope {
        SyncEnvelope {
            timestamp,
            data: DatasetSnapshot {
                categories: Some(vec![vela_core::Category {
                    id: "r1".into(),
                    name: "Remote".into(),
                }]),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn push_clears_dirty_on_success_only() {
        let endpoint = Arc::new(MockEndpoint::default());
        let engine = SyncEngine::new(endpoint.clone());
        let store = store();
        store.lock().await.add_category("Local").unwrap();
        assert!(store.lock().await.is_dirty());

        engine.push(&store).await.unwrap();
        assert!(!store.lock().await.is_dirty());
        assert_eq!(endpoint.push_count(), 1);
        assert!(engine.last_sync().is_some());
    }

    #[tokio::test]
    async fn failed_push_keeps_dirty_and_notifies() {
        let endpoint = Arc::new(MockEndpoint::default());
        endpoint.fail_push.store(true, Ordering::SeqCst);
        let engine = SyncEngine::new(endpoint);
        let store = store();
        store.lock().await.add_category("Local").unwrap();

        let err = engine.push(&store).await.unwrap_err();
        assert!(err.is_retryable());
        let store = store.lock().await;
        assert!(store.is_dirty());
        assert_eq!(store.notifier().active(Utc::now()).len(), 1);
        assert!(engine.last_sync().is_none());
    }

    #[tokio::test]
    async fn clean_pull_applies_the_remote_snapshot() {
        let endpoint = Arc::new(MockEndpoint::default());
        endpoint.serve(&remote_envelope(Utc::now().timestamp_millis()));
        let engine = SyncEngine::new(endpoint);
        let store = store();

        let outcome = engine.pull(&store, false).await.unwrap();
        assert_eq!(outcome, PullOutcome::Applied);
        let store = store.lock().await;
        assert_eq!(store.categories()[0].name, "Remote");
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn dirty_local_newer_aborts_the_pull_and_pushes() {
        let endpoint = Arc::new(MockEndpoint::default());
        // Remote snapshot is a minute older than the local edit below.
        endpoint.serve(&remote_envelope(Utc::now().timestamp_millis() - 60_000));
        let engine = SyncEngine::new(endpoint.clone());
        let store = store();
        store.lock().await.add_category("Local").unwrap();

        let outcome = engine.pull(&store, false).await.unwrap();
        assert_eq!(outcome, PullOutcome::PushedLocal);
        // Local data survived and went up; nothing was overwritten.
        let store = store.lock().await;
        assert_eq!(store.categories()[0].name, "Local");
        assert_eq!(endpoint.push_count(), 1);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn remote_within_skew_still_counts_as_older() {
        let endpoint = Arc::new(MockEndpoint::default());
        // Remote claims to be 5s ahead, inside the 10s guard.
        endpoint.serve(&remote_envelope(Utc::now().timestamp_millis() + 5_000));
        let engine = SyncEngine::new(endpoint.clone());
        let store = store();
        store.lock().await.add_category("Local").unwrap();

        let outcome = engine.pull(&store, false).await.unwrap();
        assert_eq!(outcome, PullOutcome::PushedLocal);
    }

    #[tokio::test]
    async fn remote_newer_beyond_skew_wins_even_when_dirty() {
        let endpoint = Arc::new(MockEndpoint::default());
        endpoint.serve(&remote_envelope(Utc::now().timestamp_millis() + 60_000));
        let engine = SyncEngine::new(endpoint);
        let store = store();
        store.lock().await.add_category("Local").unwrap();

        let outcome = engine.pull(&store, false).await.unwrap();
        assert_eq!(outcome, PullOutcome::Applied);
        assert_eq!(store.lock().await.categories()[0].name, "Remote");
    }

    #[tokio::test]
    async fn forced_pull_always_overwrites() {
        let endpoint = Arc::new(MockEndpoint::default());
        endpoint.serve(&remote_envelope(0)); // ancient remote copy
        let engine = SyncEngine::new(endpoint);
        let store = store();
        store.lock().await.add_category("Local").unwrap();

        let outcome = engine.pull(&store, true).await.unwrap();
        assert_eq!(outcome, PullOutcome::Applied);
        let store = store.lock().await;
        assert_eq!(store.categories()[0].name, "Remote");
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn failed_pull_leaves_everything_untouched() {
        let endpoint = Arc::new(MockEndpoint::default());
        endpoint.fail_pull.store(true, Ordering::SeqCst);
        let engine = SyncEngine::new(endpoint);
        let store = store();
        store.lock().await.add_category("Local").unwrap();

        assert!(engine.pull(&store, false).await.is_err());
        let store = store.lock().await;
        assert!(store.is_dirty());
        assert_eq!(store.categories()[0].name, "Local");
        assert_eq!(store.notifier().active(Utc::now()).len(), 1);
    }

    /// An endpoint that writes through the shared store while its fetch is
    /// in flight, proving the lock is not held across the network await.
    struct InterleavingEndpoint {
        store: Arc<Mutex<EntityStore>>,
        body: String,
    }

    #[async_trait]
    impl RemoteEndpoint for InterleavingEndpoint {
        async fn push(&self, _payload: &str) -> SyncResult<()> {
            Ok(())
        }

        async fn pull(&self) -> SyncResult<String> {
            self.store.lock().await.add_category("Mid-pull").unwrap();
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn writes_can_land_between_fetch_and_apply() {
        let store = Arc::new(store());
        let envelope = remote_envelope(Utc::now().timestamp_millis() + 60_000);
        let endpoint = Arc::new(InterleavingEndpoint {
            store: store.clone(),
            body: encode_envelope(&envelope).unwrap(),
        });
        let engine = SyncEngine::new(endpoint);

        let outcome = engine.pull(&store, false).await.unwrap();
        // The mid-flight write made the store dirty, but the remote copy is
        // newer beyond the skew guard and wins wholesale.
        assert_eq!(outcome, PullOutcome::Applied);
        assert_eq!(store.lock().await.categories()[0].name, "Remote");
    }

    #[test]
    fn missing_endpoint_reports_disabled() {
        let settings = CloudSettings::default();
        assert!(matches!(
            SyncEngine::from_settings(&settings),
            Err(SyncError::Disabled)
        ));
    }
}
