//! # Domain Types
//!
//! Core domain types for the Vela POS dataset.
//!
//! ## Wire Format
//! Every record serializes with camelCase field names because the persisted
//! key-value layer and the cloud snapshot both carry the same JSON shape
//! (see the `cashMovements` / `userInvites` store keys in vela-store).
//!
//! ## Identity
//! - `id`: string, unique within its collection. Sequenced collections
//!   (products, transactions, ...) get human-readable numeric ids from
//!   [`crate::sequence::next_sequence`]; everything else uses UUID v4.
//! - Ordering within a collection is insertion order. Transactions and
//!   activity logs are additionally read newest-first for display; order has
//!   no integrity meaning.
//!
//! ## Money
//! All monetary values are integer cents (`i64`). Never floats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Products & Categories
// =============================================================================

/// A sellable variant of a product (size, color, ...). Carries its own stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub name: String,
    /// Unit price in cents for this variant.
    pub price_cents: i64,
    /// Stock held for this variant. Never negative.
    pub stock: i64,
}

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Category id, if assigned.
    pub category_id: Option<String>,
    /// Unit price in cents (smallest currency unit).
    pub price_cents: i64,
    /// Acquisition cost in cents (for margin reports).
    pub cost_cents: i64,
    /// Stock on hand. For variant-bearing products this is always the sum of
    /// the variant stocks (see [`Product::reconcile_stock`]).
    pub stock: i64,
    /// Variants, each with its own stock. Empty for simple products.
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true if this product tracks stock per variant.
    #[inline]
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Recomputes the parent stock from variant stocks.
    ///
    /// Invariant: `stock` on a variant-bearing product equals the sum of its
    /// variant stocks. Simple products keep their own counter.
    pub fn reconcile_stock(&mut self) {
        if self.has_variants() {
            self.stock = self.variants.iter().map(|v| v.stock).sum();
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Transactions (sales)
// =============================================================================

/// Settlement state of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Fully paid.
    Paid,
    /// Partially paid; the remainder is customer debt.
    Partial,
    /// Nothing paid yet; the full total is customer debt.
    Pending,
}

/// How a payment was (or will be) collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash into the register drawer. The only method that moves the
    /// cash-register balance.
    Cash,
    Card,
    Transfer,
    /// Store credit against a customer account.
    Credit,
}

/// Lifecycle state of a sale. Cancellation is logical: cancelled transactions
/// stay in the collection forever to preserve audit and cash-flow history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Active,
    Cancelled,
}

/// A line item in a sale. Name and price are frozen at sale time so later
/// product edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl TransactionItem {
    /// Line total before discounts.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

/// A sale transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub items: Vec<TransactionItem>,
    pub total_cents: i64,
    /// Amount settled so far. `amount_paid_cents <= total_cents` while the
    /// transaction is active.
    pub amount_paid_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: TransactionStatus,
    /// Customer the sale is attributed to; required for credit sales.
    #[serde(default)]
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Unpaid remainder, never negative.
    #[inline]
    pub fn outstanding_cents(&self) -> i64 {
        (self.total_cents - self.amount_paid_cents).max(0)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == TransactionStatus::Cancelled
    }
}

// =============================================================================
// Customers & Suppliers
// =============================================================================

/// A customer account with optional store credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Maximum debt allowed when `has_unlimited_credit` is false.
    pub credit_limit_cents: i64,
    /// Outstanding debt. Never negative; bounded by the credit limit unless
    /// unlimited credit is granted.
    pub current_debt_cents: i64,
    pub has_unlimited_credit: bool,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Remaining credit before the limit is hit. `None` means unlimited.
    pub fn credit_headroom_cents(&self) -> Option<i64> {
        if self.has_unlimited_credit {
            None
        } else {
            Some((self.credit_limit_cents - self.current_debt_cents).max(0))
        }
    }
}

/// A supplier of purchased goods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// Lifecycle of a customer order.
///
/// Transitions are monotonic forward (`PENDING → IN_PROGRESS → COMPLETED`);
/// `CANCELLED` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::InProgress => 1,
            OrderStatus::Completed => 2,
            // Terminal; rank never compared forward from here.
            OrderStatus::Cancelled => 3,
        }
    }

    /// Terminal states accept no further transitions.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Checks the monotonic-forward rule.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == OrderStatus::Cancelled {
            return true;
        }
        next.rank() > self.rank()
    }
}

/// A line item on a customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// A customer order prepared ahead of a register sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Order total from its line items.
    pub fn total_cents(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.unit_price_cents * i.quantity)
            .sum()
    }
}

// =============================================================================
// Purchases (restocking)
// =============================================================================

/// A line item on a supplier purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// A stock purchase from a supplier. Restocks products and books an EXPENSE
/// cash movement when paid from the register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub items: Vec<PurchaseItem>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash Register
// =============================================================================

/// Kind of cash-register movement. The sign of a movement's effect on the
/// balance is derived from the kind; amounts are stored non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashMovementKind {
    /// Opening float when the register opens.
    Open,
    Deposit,
    Expense,
    Withdrawal,
    /// Register close marker; neutral for the balance.
    Close,
}

impl CashMovementKind {
    /// Signed effect of a movement of `amount_cents` on the register balance.
    pub fn signed_cents(self, amount_cents: i64) -> i64 {
        match self {
            CashMovementKind::Open | CashMovementKind::Deposit => amount_cents,
            CashMovementKind::Expense | CashMovementKind::Withdrawal => -amount_cents,
            CashMovementKind::Close => 0,
        }
    }
}

/// A single cash-register movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CashMovementKind,
    /// Always >= 0; the kind decides the sign.
    pub amount_cents: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Current register balance over a movement history.
pub fn cash_balance_cents(movements: &[CashMovement]) -> i64 {
    movements
        .iter()
        .map(|m| m.kind.signed_cents(m.amount_cents))
        .sum()
}

// =============================================================================
// Users & Invites
// =============================================================================

/// Static role set. Authorization beyond these three roles is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    Cashier,
}

/// A user account.
///
/// `password_hash` is derived from the password and the per-user `salt`;
/// plaintext is never stored or compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Unique case-insensitively; enforced at registration time.
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub failed_login_attempts: u32,
    #[serde(default)]
    pub lockout_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_two_factor_enabled: bool,
    #[serde(default)]
    pub two_factor_secret: Option<String>,
    /// Static recovery code for account recovery.
    #[serde(default)]
    pub recovery_code: Option<String>,
    /// Salted hash of the security-question answer.
    #[serde(default)]
    pub security_answer_hash: Option<String>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true if the account is locked out at `now`.
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lockout_until, Some(until) if until > now)
    }
}

/// A single-use registration invite bound to a role. Consumed and removed on
/// successful registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInvite {
    pub code: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Activity Log
// =============================================================================

/// An append-only audit entry, attributed to the acting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Business Settings (singleton)
// =============================================================================

/// Starting offsets for the human-readable id sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSettings {
    #[serde(default = "default_seq_start")]
    pub product_start: u64,
    #[serde(default = "default_seq_start")]
    pub transaction_start: u64,
    #[serde(default = "default_seq_start")]
    pub customer_start: u64,
    #[serde(default = "default_seq_start")]
    pub supplier_start: u64,
    #[serde(default = "default_seq_start")]
    pub order_start: u64,
    #[serde(default = "default_seq_start")]
    pub purchase_start: u64,
}

fn default_seq_start() -> u64 {
    1
}

impl Default for SequenceSettings {
    fn default() -> Self {
        SequenceSettings {
            product_start: 1,
            transaction_start: 1,
            customer_start: 1,
            supplier_start: 1,
            order_start: 1,
            purchase_start: 1,
        }
    }
}

/// Cloud sync endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSettings {
    /// Sync endpoint URL. Sync is disabled while unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Shared secret sent with every push/pull.
    #[serde(default)]
    pub secret: String,
    /// Whether the periodic scheduler runs.
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    /// Fixed scheduler interval.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for CloudSettings {
    fn default() -> Self {
        CloudSettings {
            endpoint: None,
            secret: String::new(),
            auto_sync: true,
            sync_interval_secs: default_sync_interval(),
        }
    }
}

/// The settings singleton. Replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSettings {
    #[serde(default = "default_business_name")]
    pub business_name: String,
    #[serde(default)]
    pub sequences: SequenceSettings,
    #[serde(default)]
    pub cloud: CloudSettings,
    /// Hard-reject credit sales over the customer limit when true; otherwise
    /// the sale proceeds with a warning notification.
    #[serde(default = "default_true")]
    pub enforce_credit_limit: bool,
    /// Idle minutes before the app auto-locks. 0 disables idle lock.
    #[serde(default)]
    pub idle_lock_minutes: u32,
    /// Activity log retention cap (oldest entries evicted past this).
    #[serde(default = "default_activity_log_cap")]
    pub activity_log_cap: usize,
}

fn default_business_name() -> String {
    "Vela POS".to_string()
}

fn default_activity_log_cap() -> usize {
    500
}

impl Default for BusinessSettings {
    fn default() -> Self {
        BusinessSettings {
            business_name: default_business_name(),
            sequences: SequenceSettings::default(),
            cloud: CloudSettings::default(),
            enforce_credit_limit: true,
            idle_lock_minutes: 0,
            activity_log_cap: default_activity_log_cap(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
