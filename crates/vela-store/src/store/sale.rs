//! Sale transaction and cash-register mutators.
//!
//! A sale is the busiest mutator in the store: it moves stock, may move the
//! register balance, and may move customer debt, all in one commit. Amounts
//! are integer cents throughout.
//!
//! ## Cash Coupling
//! Only the `cash` payment method touches the register. A cash-settled sale
//! books a `DEPOSIT` for the amount actually paid; cancelling it later books
//! the matching `WITHDRAWAL`.
//!
//! ## Debt Coupling
//! The unpaid remainder of a sale becomes customer debt, bounded by the
//! customer's credit limit unless unlimited credit is granted. Whether a
//! breach rejects the sale or merely warns is a settings toggle.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use vela_core::{
    cash_balance_cents, next_sequence, CashMovement, CashMovementKind, CoreError, PaymentMethod,
    PaymentStatus, Transaction, TransactionItem, TransactionStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::notify::Severity;
use crate::storage::keys;

use super::EntityStore;

/// Input for creating a sale.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub items: Vec<TransactionItem>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Amount tendered for `partial` settlements; ignored otherwise.
    pub partial_amount_cents: i64,
    pub customer_id: Option<String>,
}

impl EntityStore {
    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale: freezes line items, decrements stock, books the cash
    /// deposit for cash settlements, and raises customer debt for the unpaid
    /// remainder.
    pub fn add_transaction(&mut self, draft: TransactionDraft) -> StoreResult<Transaction> {
        if draft.items.is_empty() {
            return Err(CoreError::Required { field: "items" }.into());
        }

        let total_cents: i64 = draft.items.iter().map(|i| i.line_total_cents()).sum();
        let amount_paid_cents = match draft.payment_status {
            PaymentStatus::Paid => total_cents,
            PaymentStatus::Partial => draft.partial_amount_cents.clamp(0, total_cents),
            PaymentStatus::Pending => 0,
        };
        let debt_cents = total_cents - amount_paid_cents;

        // Debt needs an account to attach to.
        if debt_cents > 0 && draft.customer_id.is_none() {
            return Err(StoreError::CustomerRequired);
        }
        if let (true, Some(customer_id)) = (debt_cents > 0, draft.customer_id.as_deref()) {
            self.check_credit_headroom(customer_id, debt_cents)?;
        }

        let id = next_sequence(
            self.transactions.iter().map(|t| t.id.as_str()),
            self.settings.sequences.transaction_start,
        );
        let transaction = Transaction {
            id: id.clone(),
            items: draft.items,
            total_cents,
            amount_paid_cents,
            payment_method: draft.payment_method,
            payment_status: draft.payment_status,
            status: TransactionStatus::Active,
            customer_id: draft.customer_id.clone(),
            created_at: Utc::now(),
        };

        // 1. the sale itself.
        self.transactions.push(transaction.clone());

        // 2. derived transitions: stock, register, debt.
        for item in &transaction.items {
            self.apply_stock_delta(&item.product_id, item.variant_id.as_deref(), -item.quantity);
        }
        if transaction.payment_method == PaymentMethod::Cash && amount_paid_cents > 0 {
            self.record_cash_movement(
                CashMovementKind::Deposit,
                amount_paid_cents,
                format!("Sale #{id}"),
            );
        }
        if let (true, Some(customer_id)) = (debt_cents > 0, draft.customer_id.as_deref()) {
            self.apply_debt_delta(customer_id, debt_cents);
        }

        info!(
            transaction = %id,
            total_cents,
            amount_paid_cents,
            method = ?transaction.payment_method,
            "Sale recorded"
        );
        self.log_activity(
            "CREATE_SALE",
            format!("Sale #{id} for {total_cents} cents ({amount_paid_cents} paid)"),
        );
        self.commit(&[
            keys::TRANSACTIONS,
            keys::PRODUCTS,
            keys::CASH_MOVEMENTS,
            keys::CUSTOMERS,
        ]);
        Ok(transaction)
    }

    /// Applies a payment against an active sale's outstanding balance.
    ///
    /// Promotes the settlement state when fully paid, books a register
    /// deposit for cash payments, and releases the matching customer debt.
    pub fn register_transaction_payment(
        &mut self,
        transaction_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> StoreResult<Transaction> {
        if amount_cents <= 0 {
            return Err(CoreError::NegativeAmount {
                field: "payment",
                value: amount_cents,
            }
            .into());
        }

        let transaction = self
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| StoreError::not_found("Transaction", transaction_id))?;
        if transaction.is_cancelled() {
            return Err(StoreError::TransactionCancelled {
                id: transaction_id.to_string(),
            });
        }

        let outstanding_cents = transaction.outstanding_cents();
        if amount_cents > outstanding_cents {
            return Err(CoreError::PaymentExceedsBalance {
                amount_cents,
                outstanding_cents,
            }
            .into());
        }

        transaction.amount_paid_cents += amount_cents;
        transaction.payment_status = if transaction.outstanding_cents() == 0 {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };
        let updated = transaction.clone();

        if method == PaymentMethod::Cash {
            self.record_cash_movement(
                CashMovementKind::Deposit,
                amount_cents,
                format!("Payment on sale #{transaction_id}"),
            );
        }
        if let Some(customer_id) = updated.customer_id.clone() {
            self.apply_debt_delta(&customer_id, -amount_cents);
        }

        self.log_activity(
            "REGISTER_PAYMENT",
            format!("Payment of {amount_cents} cents on sale #{transaction_id}"),
        );
        self.commit(&[keys::TRANSACTIONS, keys::CASH_MOVEMENTS, keys::CUSTOMERS]);
        Ok(updated)
    }

    /// Cancels a sale logically: the record stays forever with status
    /// `cancelled`, stock is replayed in reverse, cash paid through the
    /// register is withdrawn, and unpaid debt is released.
    pub fn cancel_transaction(&mut self, transaction_id: &str) -> StoreResult<Transaction> {
        let transaction = self
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| StoreError::not_found("Transaction", transaction_id))?;
        if transaction.is_cancelled() {
            return Err(StoreError::TransactionCancelled {
                id: transaction_id.to_string(),
            });
        }

        transaction.status = TransactionStatus::Cancelled;
        let cancelled = transaction.clone();

        // Inverse replay of the sale's side effects.
        for item in &cancelled.items {
            self.apply_stock_delta(&item.product_id, item.variant_id.as_deref(), item.quantity);
        }
        if cancelled.payment_method == PaymentMethod::Cash && cancelled.amount_paid_cents > 0 {
            self.record_cash_movement(
                CashMovementKind::Withdrawal,
                cancelled.amount_paid_cents,
                format!("Cancelled sale #{transaction_id}"),
            );
        }
        if let Some(customer_id) = cancelled.customer_id.clone() {
            self.apply_debt_delta(&customer_id, -cancelled.outstanding_cents());
        }

        info!(transaction = transaction_id, "Sale cancelled");
        self.log_activity(
            "CANCEL_SALE",
            format!("Cancelled sale #{transaction_id}"),
        );
        self.commit(&[
            keys::TRANSACTIONS,
            keys::PRODUCTS,
            keys::CASH_MOVEMENTS,
            keys::CUSTOMERS,
        ]);
        Ok(cancelled)
    }

    // =========================================================================
    // Cash Register
    // =========================================================================

    /// Books a manual register movement (open float, expense, withdrawal...).
    pub fn add_cash_movement(
        &mut self,
        kind: CashMovementKind,
        amount_cents: i64,
        description: impl Into<String>,
    ) -> StoreResult<CashMovement> {
        if amount_cents < 0 {
            return Err(CoreError::NegativeAmount {
                field: "amount",
                value: amount_cents,
            }
            .into());
        }

        let movement = self.record_cash_movement(kind, amount_cents, description.into());
        self.log_activity(
            "CASH_MOVEMENT",
            format!("{:?} of {} cents", movement.kind, movement.amount_cents),
        );
        self.commit(&[keys::CASH_MOVEMENTS]);
        Ok(movement)
    }

    /// Current register balance over the full movement history.
    pub fn cash_balance(&self) -> i64 {
        cash_balance_cents(&self.cash_movements)
    }

    // =========================================================================
    // Internal side-effect helpers
    // =========================================================================

    /// Appends a movement without auditing or committing; sale flows fold it
    /// into their own commit.
    pub(super) fn record_cash_movement(
        &mut self,
        kind: CashMovementKind,
        amount_cents: i64,
        description: String,
    ) -> CashMovement {
        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            kind,
            amount_cents,
            description,
            created_at: Utc::now(),
        };
        self.cash_movements.push(movement.clone());
        movement
    }

    /// Applies a stock delta with the zero clamp. Missing products are
    /// skipped: a deleted product must not block selling or cancelling.
    pub(super) fn apply_stock_delta(
        &mut self,
        product_id: &str,
        variant_id: Option<&str>,
        delta: i64,
    ) {
        let Some(product) = self.products.iter_mut().find(|p| p.id == product_id) else {
            return;
        };
        match variant_id {
            Some(vid) => {
                if let Some(variant) = product.variants.iter_mut().find(|v| v.id == vid) {
                    variant.stock = (variant.stock + delta).max(0);
                }
                product.reconcile_stock();
            }
            None => {
                product.stock = (product.stock + delta).max(0);
            }
        }
        product.updated_at = Utc::now();
    }

    /// Rejects or warns when a debt increase would breach a bounded
    /// customer's credit limit, per the enforcement toggle.
    fn check_credit_headroom(&self, customer_id: &str, debt_cents: i64) -> StoreResult<()> {
        let customer = self
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .ok_or_else(|| StoreError::not_found("Customer", customer_id))?;

        let Some(headroom_cents) = customer.credit_headroom_cents() else {
            return Ok(());
        };
        if debt_cents <= headroom_cents {
            return Ok(());
        }

        if self.settings.enforce_credit_limit {
            return Err(StoreError::CreditLimitExceeded {
                customer: customer.name.clone(),
                requested_cents: debt_cents,
                available_cents: headroom_cents,
            });
        }
        self.notifier.notify(
            "Credit limit exceeded",
            format!(
                "{} is over their credit limit by {} cents",
                customer.name,
                debt_cents - headroom_cents
            ),
            Severity::Warning,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::product::ProductDraft;
    use super::super::testutil::memory_store;
    use super::*;
    use vela_core::ProductVariant;

    fn item(product_id: &str, quantity: i64, unit_price_cents: i64) -> TransactionItem {
        TransactionItem {
            product_id: product_id.into(),
            variant_id: None,
            name: format!("item-{product_id}"),
            quantity,
            unit_price_cents,
        }
    }

    fn cash_sale(items: Vec<TransactionItem>) -> TransactionDraft {
        TransactionDraft {
            items,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
            partial_amount_cents: 0,
            customer_id: None,
        }
    }

    fn seeded_store() -> super::super::EntityStore {
        let mut store = memory_store();
        store
            .add_product(ProductDraft {
                name: "Coffee".into(),
                price_cents: 350,
                stock: 10,
                ..Default::default()
            })
            .unwrap();
        store
    }

    #[test]
    fn cash_sale_books_a_matching_deposit() {
        let mut store = seeded_store();
        let tx = store.add_transaction(cash_sale(vec![item("1", 2, 350)])).unwrap();

        assert_eq!(tx.total_cents, 700);
        assert_eq!(tx.amount_paid_cents, 700);
        assert_eq!(store.cash_balance(), 700);
        let deposit = &store.cash_movements()[0];
        assert_eq!(deposit.kind, CashMovementKind::Deposit);
        assert_eq!(deposit.amount_cents, 700);
    }

    #[test]
    fn sale_decrements_stock_with_zero_clamp() {
        let mut store = seeded_store();
        store.add_transaction(cash_sale(vec![item("1", 25, 350)])).unwrap();
        assert_eq!(store.products()[0].stock, 0);
    }

    #[test]
    fn variant_sale_decrements_the_variant() {
        let mut store = memory_store();
        store
            .add_product(ProductDraft {
                name: "Shirt".into(),
                variants: vec![ProductVariant {
                    id: "m".into(),
                    name: "M".into(),
                    price_cents: 1500,
                    stock: 5,
                }],
                ..Default::default()
            })
            .unwrap();

        let mut line = item("1", 2, 1500);
        line.variant_id = Some("m".into());
        store.add_transaction(cash_sale(vec![line])).unwrap();

        let product = &store.products()[0];
        assert_eq!(product.variants[0].stock, 3);
        assert_eq!(product.stock, 3);
    }

    #[test]
    fn unpaid_sale_requires_a_customer() {
        let mut store = seeded_store();
        let err = store
            .add_transaction(TransactionDraft {
                items: vec![item("1", 1, 350)],
                payment_method: PaymentMethod::Credit,
                payment_status: PaymentStatus::Pending,
                partial_amount_cents: 0,
                customer_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::CustomerRequired));
    }

    #[test]
    fn credit_sale_over_limit_is_rejected_when_enforced() {
        let mut store = seeded_store();
        let customer = store.add_customer(crate::store::CustomerDraft {
            name: "Bo".into(),
            credit_limit_cents: 500,
            ..Default::default()
        })
        .unwrap();

        let err = store
            .add_transaction(TransactionDraft {
                items: vec![item("1", 2, 350)],
                payment_method: PaymentMethod::Credit,
                payment_status: PaymentStatus::Pending,
                partial_amount_cents: 0,
                customer_id: Some(customer.id),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::CreditLimitExceeded { .. }));
        // Nothing committed: no sale, no stock change, no debt.
        assert!(store.transactions().is_empty());
        assert_eq!(store.products()[0].stock, 10);
    }

    #[test]
    fn credit_sale_over_limit_warns_when_enforcement_is_off() {
        let mut store = seeded_store();
        let mut settings = store.settings().clone();
        settings.enforce_credit_limit = false;
        store.update_settings(settings);

        let customer = store.add_customer(crate::store::CustomerDraft {
            name: "Bo".into(),
            credit_limit_cents: 500,
            ..Default::default()
        })
        .unwrap();

        store
            .add_transaction(TransactionDraft {
                items: vec![item("1", 2, 350)],
                payment_method: PaymentMethod::Credit,
                payment_status: PaymentStatus::Pending,
                partial_amount_cents: 0,
                customer_id: Some(customer.id.clone()),
            })
            .unwrap();

        let customer = store.customers().iter().find(|c| c.id == customer.id).unwrap();
        assert_eq!(customer.current_debt_cents, 700);
        assert_eq!(store.notifier().active(chrono::Utc::now()).len(), 1);
    }

    #[test]
    fn partial_payment_promotes_to_paid_and_releases_debt() {
        let mut store = seeded_store();
        let customer = store.add_customer(crate::store::CustomerDraft {
            name: "Bo".into(),
            has_unlimited_credit: true,
            ..Default::default()
        })
        .unwrap();

        let tx = store
            .add_transaction(TransactionDraft {
                items: vec![item("1", 2, 350)],
                payment_method: PaymentMethod::Cash,
                payment_status: PaymentStatus::Partial,
                partial_amount_cents: 300,
                customer_id: Some(customer.id.clone()),
            })
            .unwrap();
        assert_eq!(tx.outstanding_cents(), 400);

        let updated = store
            .register_transaction_payment(&tx.id, 400, PaymentMethod::Cash)
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
        assert_eq!(updated.outstanding_cents(), 0);

        let customer = store.customers().iter().find(|c| c.id == customer.id).unwrap();
        assert_eq!(customer.current_debt_cents, 0);
        // Two deposits: 300 at sale time, 400 at settlement.
        assert_eq!(store.cash_balance(), 700);
    }

    #[test]
    fn overpayment_is_rejected() {
        let mut store = seeded_store();
        let customer = store
            .add_customer(crate::store::CustomerDraft {
                name: "Bo".into(),
                has_unlimited_credit: true,
                ..Default::default()
            })
            .unwrap();
        let tx = store
            .add_transaction(TransactionDraft {
                items: vec![item("1", 1, 350)],
                payment_method: PaymentMethod::Cash,
                payment_status: PaymentStatus::Partial,
                partial_amount_cents: 100,
                customer_id: Some(customer.id),
            })
            .unwrap();

        let err = store
            .register_transaction_payment(&tx.id, 9_999, PaymentMethod::Cash)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::PaymentExceedsBalance { .. })
        ));
    }

    #[test]
    fn cancel_replays_stock_cash_and_debt() {
        let mut store = seeded_store();
        let customer = store.add_customer(crate::store::CustomerDraft {
            name: "Bo".into(),
            has_unlimited_credit: true,
            ..Default::default()
        })
        .unwrap();

        let tx = store
            .add_transaction(TransactionDraft {
                items: vec![item("1", 3, 350)],
                payment_method: PaymentMethod::Cash,
                payment_status: PaymentStatus::Partial,
                partial_amount_cents: 500,
                customer_id: Some(customer.id.clone()),
            })
            .unwrap();
        assert_eq!(store.products()[0].stock, 7);

        let cancelled = store.cancel_transaction(&tx.id).unwrap();
        assert!(cancelled.is_cancelled());

        // The record stays; stock, cash, and debt are replayed in reverse.
        assert_eq!(store.transactions().len(), 1);
        assert_eq!(store.products()[0].stock, 10);
        assert_eq!(store.cash_balance(), 0);
        let customer = store.customers().iter().find(|c| c.id == customer.id).unwrap();
        assert_eq!(customer.current_debt_cents, 0);
    }

    #[test]
    fn cancelled_sale_rejects_further_operations() {
        let mut store = seeded_store();
        let tx = store.add_transaction(cash_sale(vec![item("1", 1, 350)])).unwrap();
        store.cancel_transaction(&tx.id).unwrap();

        assert!(matches!(
            store.register_transaction_payment(&tx.id, 1, PaymentMethod::Cash),
            Err(StoreError::TransactionCancelled { .. })
        ));
        assert!(matches!(
            store.cancel_transaction(&tx.id),
            Err(StoreError::TransactionCancelled { .. })
        ));
    }

    #[test]
    fn manual_movement_rejects_negative_amounts() {
        let mut store = memory_store();
        assert!(store
            .add_cash_movement(CashMovementKind::Open, -5, "bad float")
            .is_err());
        store
            .add_cash_movement(CashMovementKind::Open, 1000, "opening float")
            .unwrap();
        assert_eq!(store.cash_balance(), 1000);
    }

    #[test]
    fn transaction_ids_are_sequential() {
        let mut store = seeded_store();
        let a = store.add_transaction(cash_sale(vec![item("1", 1, 350)])).unwrap();
        let b = store.add_transaction(cash_sale(vec![item("1", 1, 350)])).unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");
    }
}
