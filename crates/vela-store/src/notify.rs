//! # Notification Bus
//!
//! Fire-and-expire user-facing messages. Components push toasts; the UI layer
//! polls [`Notifier::active`] and may cancel early with
//! [`Notifier::remove_toast`].
//!
//! The bus is advisory presentation state: nothing in the data core depends
//! on a toast being seen.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a toast stays visible unless removed early.
pub const TOAST_TTL_SECS: i64 = 5;

/// Message severity, mapped to presentation styling by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct NotifierInner {
    next_id: u64,
    toasts: Vec<Toast>,
}

/// Shared notification bus handle. Clones share the same toast list.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<NotifierInner>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a toast and returns its id.
    pub fn notify(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> u64 {
        let now = Utc::now();
        let mut inner = self.inner.lock().expect("notifier poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.toasts.push(Toast {
            id,
            title: title.into(),
            message: message.into(),
            severity,
            created_at: now,
            expires_at: now + Duration::seconds(TOAST_TTL_SECS),
        });
        id
    }

    /// Cancels a toast before it expires. Returns false if it was gone.
    pub fn remove_toast(&self, id: u64) -> bool {
        let mut inner = self.inner.lock().expect("notifier poisoned");
        let before = inner.toasts.len();
        inner.toasts.retain(|t| t.id != id);
        inner.toasts.len() != before
    }

    /// Returns the live toasts at `now`, sweeping out expired ones.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Toast> {
        let mut inner = self.inner.lock().expect("notifier poisoned");
        inner.toasts.retain(|t| t.expires_at > now);
        inner.toasts.clone()
    }
}
