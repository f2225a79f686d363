//! # Sync Scheduler
//!
//! Periodic background driver for the sync engine: every tick it pushes if
//! the store has local changes, otherwise it pulls. One in-flight operation
//! at a time, graceful shutdown through a channel.
//!
//! ```text
//! ┌────────────┐   tick    ┌──────────────────────────────────────────┐
//! │ interval   ├──────────►│ dirty? (short lock)                      │
//! │ (fixed)    │           │   yes → engine.push(store)               │
//! └────────────┘           │   no  → engine.pull(store, force: no)    │
//!                          └──────────────────────────────────────────┘
//! ```
//! The engine locks the store only to snapshot and to apply; the network
//! round trip itself never holds the lock, so sales keep flowing while a
//! slow endpoint is in flight.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use vela_store::EntityStore;

use crate::engine::SyncEngine;

/// Handle to a running scheduler. Dropping it detaches the task; call
/// [`SyncSchedulerHandle::shutdown`] for a clean stop.
pub struct SyncSchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncSchedulerHandle {
    /// Stops the loop and waits for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

pub struct SyncScheduler;

impl SyncScheduler {
    /// Spawns the periodic loop over a shared store.
    pub fn spawn(
        engine: Arc<SyncEngine>,
        store: Arc<Mutex<EntityStore>>,
        interval_secs: u64,
    ) -> SyncSchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
            // Late ticks (slow endpoint) delay, not burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs, "Sync scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let dirty = store.lock().await.is_dirty();
                        let result = if dirty {
                            debug!("Tick: local changes pending, pushing");
                            engine.push(&store).await
                        } else {
                            debug!("Tick: clean, pulling");
                            engine.pull(&store, false).await.map(|_| ())
                        };
                        if let Err(e) = result {
                            // Already toasted by the engine; next tick retries.
                            warn!(error = %e, "Sync tick failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Sync scheduler stopping");
                        break;
                    }
                }
            }
        });

        SyncSchedulerHandle { shutdown_tx, task }
    }
}
