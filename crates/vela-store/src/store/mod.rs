//! # Entity Store
//!
//! In-memory collections for the whole business dataset, persisted through
//! the key-value layer. The store is the system's only write path: every
//! mutation flows through a mutator on [`EntityStore`].
//!
//! ## Mutator Contract
//! Each mutator applies four steps in order:
//! ```text
//! 1. apply the state transition
//! 2. apply derived transitions (e.g. cash sale → DEPOSIT movement)
//! 3. append an audit entry attributed to the current actor
//! 4. mark the dataset dirty for sync and persist the touched keys
//! ```
//!
//! ## Module Organization
//! - [`product`]  - products, categories, stock adjustment
//! - [`sale`]     - transactions, payments, cash register
//! - [`customer`] - customers, suppliers, debt
//! - [`order`]    - orders, purchases, incoming-order hand-off
//! - [`admin`]    - users, invites, settings
//!
//! ## Concurrency Model
//! Mutations are synchronous and run to completion before the next command;
//! the store itself takes `&mut self` and needs no internal locking. Callers
//! that share the store across async tasks wrap it in a `tokio::sync::Mutex`
//! (see vela-sync's scheduler).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use vela_core::{
    ActivityLog, BusinessSettings, CashMovement, Category, Customer, Order, Product, Purchase,
    Supplier, Transaction, User, UserInvite, SYSTEM_USER_ID,
};

use crate::notify::Notifier;
use crate::storage::{decode_value, encode_value, keys, StorageBackend};

mod admin;
mod customer;
mod order;
mod product;
mod sale;

pub use customer::CustomerDraft;
pub use order::{OrderDraft, PurchaseDraft};
pub use product::ProductDraft;
pub use sale::TransactionDraft;

/// Keys the entity store owns (everything except the session scope).
const DATASET_KEYS: &[&str] = &[
    keys::PRODUCTS,
    keys::TRANSACTIONS,
    keys::CUSTOMERS,
    keys::SUPPLIERS,
    keys::CASH_MOVEMENTS,
    keys::ORDERS,
    keys::PURCHASES,
    keys::USERS,
    keys::USER_INVITES,
    keys::CATEGORIES,
    keys::ACTIVITY_LOGS,
    keys::SETTINGS,
    keys::INCOMING_ORDER,
];

// =============================================================================
// Actor
// =============================================================================

/// Identity audit entries are attributed to. Set by the session manager on
/// login and reset to the system pseudo-user on logout.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub username: String,
}

impl Actor {
    /// The system pseudo-user, used when no session is active.
    pub fn system() -> Self {
        Actor {
            user_id: SYSTEM_USER_ID.to_string(),
            username: SYSTEM_USER_ID.to_string(),
        }
    }
}

// =============================================================================
// Dataset Snapshot
// =============================================================================

/// A full (or partial) copy of the dataset, as carried by the sync payload.
///
/// Collections absent from a remote payload stay untouched on apply; the
/// local snapshot for a push always fills every field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vec<Customer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppliers: Option<Vec<Supplier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_movements: Option<Vec<CashMovement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchases: Option<Vec<Purchase>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_invites: Option<Vec<UserInvite>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_logs: Option<Vec<ActivityLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<BusinessSettings>,
}

// =============================================================================
// Entity Store
// =============================================================================

/// Exclusive owner of every business collection.
pub struct EntityStore {
    backend: Arc<dyn StorageBackend>,
    notifier: Notifier,

    products: Vec<Product>,
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    customers: Vec<Customer>,
    suppliers: Vec<Supplier>,
    orders: Vec<Order>,
    purchases: Vec<Purchase>,
    cash_movements: Vec<CashMovement>,
    users: Vec<User>,
    user_invites: Vec<UserInvite>,
    /// Newest-first audit trail, capped by `settings.activity_log_cap`.
    activity_logs: Vec<ActivityLog>,
    settings: BusinessSettings,
    /// Single-slot hand-off of a prepared order to the sales screen.
    incoming_order: Option<Order>,

    actor: Actor,
    /// Local mutations not yet confirmed pushed to the remote endpoint.
    dirty: bool,
    /// Wall-clock time of the most recent committed mutation.
    last_local_update: DateTime<Utc>,
}

impl EntityStore {
    /// Opens the store, loading every collection from the backend.
    ///
    /// Missing or corrupt values fall back to safe defaults so a damaged
    /// store still opens; a fresh process starts clean (not dirty).
    pub fn open(backend: Arc<dyn StorageBackend>, notifier: Notifier) -> Self {
        let store = EntityStore {
            products: load_key(&backend, keys::PRODUCTS),
            categories: load_key(&backend, keys::CATEGORIES),
            transactions: load_key(&backend, keys::TRANSACTIONS),
            customers: load_key(&backend, keys::CUSTOMERS),
            suppliers: load_key(&backend, keys::SUPPLIERS),
            orders: load_key(&backend, keys::ORDERS),
            purchases: load_key(&backend, keys::PURCHASES),
            cash_movements: load_key(&backend, keys::CASH_MOVEMENTS),
            users: load_key(&backend, keys::USERS),
            user_invites: load_key(&backend, keys::USER_INVITES),
            activity_logs: load_key(&backend, keys::ACTIVITY_LOGS),
            settings: load_key(&backend, keys::SETTINGS),
            incoming_order: load_key(&backend, keys::INCOMING_ORDER),
            actor: Actor::system(),
            dirty: false,
            last_local_update: Utc::now(),
            backend,
            notifier,
        };

        info!(
            products = store.products.len(),
            transactions = store.transactions.len(),
            users = store.users.len(),
            "Entity store opened"
        );

        store
    }

    // =========================================================================
    // Read Surface (consumed by screens, reports, printing)
    // =========================================================================

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions in display order (newest first).
    pub fn transactions_newest_first(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().rev()
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn suppliers(&self) -> &[Supplier] {
        &self.suppliers
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn purchases(&self) -> &[Purchase] {
        &self.purchases
    }

    pub fn cash_movements(&self) -> &[CashMovement] {
        &self.cash_movements
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user_invites(&self) -> &[UserInvite] {
        &self.user_invites
    }

    /// Audit trail, newest first.
    pub fn activity_logs(&self) -> &[ActivityLog] {
        &self.activity_logs
    }

    pub fn settings(&self) -> &BusinessSettings {
        &self.settings
    }

    pub fn incoming_order(&self) -> Option<&Order> {
        self.incoming_order.as_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_local_update(&self) -> DateTime<Utc> {
        self.last_local_update
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    // =========================================================================
    // Actor (session integration)
    // =========================================================================

    pub fn set_actor(&mut self, actor: Actor) {
        self.actor = actor;
    }

    pub fn clear_actor(&mut self) {
        self.actor = Actor::system();
    }

    // =========================================================================
    // Sync Surface
    // =========================================================================

    /// Full dataset clone for a sync push.
    pub fn snapshot(&self) -> DatasetSnapshot {
        DatasetSnapshot {
            products: Some(self.products.clone()),
            transactions: Some(self.transactions.clone()),
            customers: Some(self.customers.clone()),
            suppliers: Some(self.suppliers.clone()),
            cash_movements: Some(self.cash_movements.clone()),
            orders: Some(self.orders.clone()),
            purchases: Some(self.purchases.clone()),
            users: Some(self.users.clone()),
            user_invites: Some(self.user_invites.clone()),
            categories: Some(self.categories.clone()),
            activity_logs: Some(self.activity_logs.clone()),
            settings: Some(self.settings.clone()),
        }
    }

    /// Wholesale-replaces every collection present in a remote snapshot.
    ///
    /// Last-writer-wins: no field-level merge is attempted. Collections
    /// absent from the payload keep their local contents. Clears the dirty
    /// flag and persists everything.
    pub fn apply_remote(&mut self, snapshot: DatasetSnapshot) {
        if let Some(v) = snapshot.products {
            self.products = v;
        }
        if let Some(v) = snapshot.transactions {
            self.transactions = v;
        }
        if let Some(v) = snapshot.customers {
            self.customers = v;
        }
        if let Some(v) = snapshot.suppliers {
            self.suppliers = v;
        }
        if let Some(v) = snapshot.cash_movements {
            self.cash_movements = v;
        }
        if let Some(v) = snapshot.orders {
            self.orders = v;
        }
        if let Some(v) = snapshot.purchases {
            self.purchases = v;
        }
        if let Some(v) = snapshot.users {
            self.users = v;
        }
        if let Some(v) = snapshot.user_invites {
            self.user_invites = v;
        }
        if let Some(v) = snapshot.categories {
            self.categories = v;
        }
        if let Some(v) = snapshot.activity_logs {
            self.activity_logs = v;
        }
        if let Some(v) = snapshot.settings {
            self.settings = v;
        }

        self.dirty = false;
        self.persist(DATASET_KEYS);
        info!("Applied remote dataset snapshot");
    }

    /// Marks local changes as confirmed pushed.
    pub fn mark_synced(&mut self) {
        self.dirty = false;
    }

    // =========================================================================
    // Audit Logger
    // =========================================================================

    /// Appends an audit entry attributed to the current actor.
    ///
    /// The trail is newest-first and capped; oldest entries are evicted and
    /// never persisted beyond the cap.
    pub(crate) fn log_activity(&mut self, action: &str, details: impl Into<String>) {
        let entry = ActivityLog {
            id: Uuid::new_v4().to_string(),
            user_id: self.actor.user_id.clone(),
            username: self.actor.username.clone(),
            action: action.to_string(),
            details: details.into(),
            timestamp: Utc::now(),
        };
        self.activity_logs.insert(0, entry);

        let cap = self.settings.activity_log_cap.max(1);
        self.activity_logs.truncate(cap);
    }

    // =========================================================================
    // Commit (dirty flag + persistence)
    // =========================================================================

    /// Final mutator step: mark the dataset dirty and persist the touched
    /// keys (the audit trail is always included).
    pub(crate) fn commit(&mut self, touched: &[&str]) {
        self.dirty = true;
        self.last_local_update = Utc::now();
        self.persist(touched);
        self.persist(&[keys::ACTIVITY_LOGS]);
    }

    /// Best-effort persistence: encode and write each key, logging failures
    /// instead of surfacing them (the in-memory dataset stays authoritative).
    fn persist(&self, touched: &[&str]) {
        for key in touched {
            let encoded = match *key {
                keys::PRODUCTS => encode_value(&self.products),
                keys::TRANSACTIONS => encode_value(&self.transactions),
                keys::CUSTOMERS => encode_value(&self.customers),
                keys::SUPPLIERS => encode_value(&self.suppliers),
                keys::CASH_MOVEMENTS => encode_value(&self.cash_movements),
                keys::ORDERS => encode_value(&self.orders),
                keys::PURCHASES => encode_value(&self.purchases),
                keys::USERS => encode_value(&self.users),
                keys::USER_INVITES => encode_value(&self.user_invites),
                keys::CATEGORIES => encode_value(&self.categories),
                keys::ACTIVITY_LOGS => encode_value(&self.activity_logs),
                keys::SETTINGS => encode_value(&self.settings),
                keys::INCOMING_ORDER => encode_value(&self.incoming_order),
                other => {
                    warn!(key = other, "Unknown persist key");
                    continue;
                }
            };

            match encoded {
                Ok(value) => {
                    if let Err(e) = self.backend.save(key, &value) {
                        warn!(key, error = %e, "Best-effort persist failed");
                    }
                }
                Err(e) => warn!(key, error = %e, "Failed to encode collection"),
            }
        }
    }
}

fn load_key<T: DeserializeOwned + Default>(backend: &Arc<dyn StorageBackend>, key: &str) -> T {
    match backend.load(key) {
        Some(raw) => decode_value(&raw).unwrap_or_else(|| {
            warn!(key, "Stored value unreadable, falling back to default");
            T::default()
        }),
        None => T::default(),
    }
}

// =============================================================================
// Test Utilities
// =============================================================================

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::storage::MemoryBackend;

    /// A fresh in-memory store for unit tests.
    pub fn memory_store() -> EntityStore {
        EntityStore::open(Arc::new(MemoryBackend::new()), Notifier::new())
    }

    /// A store plus its backend, for reopen/persistence tests.
    pub fn memory_store_with_backend() -> (EntityStore, Arc<dyn StorageBackend>) {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let store = EntityStore::open(backend.clone(), Notifier::new());
        (store, backend)
    }
}

// =============================================================================
// Tests
// =============================================================================
