//! Customer and supplier mutators.
//!
//! Customer debt is the only balance tracked here; it never goes negative
//! and only sale flows may raise it.

use chrono::Utc;
use tracing::warn;

use vela_core::{next_sequence, CashMovementKind, CoreError, Customer, Supplier};

use crate::error::{StoreError, StoreResult};
use crate::storage::keys;

use super::EntityStore;

/// Input for creating a customer account.
#[derive(Debug, Clone, Default)]
pub struct CustomerDraft {
    pub name: String,
    pub phone: Option<String>,
    pub credit_limit_cents: i64,
    pub has_unlimited_credit: bool,
}

impl EntityStore {
    // =========================================================================
    // Customers
    // =========================================================================

    /// Creates a customer with the next sequenced id and zero debt.
    pub fn add_customer(&mut self, draft: CustomerDraft) -> StoreResult<Customer> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::Required { field: "name" }.into());
        }

        let id = next_sequence(
            self.customers.iter().map(|c| c.id.as_str()),
            self.settings.sequences.customer_start,
        );
        let customer = Customer {
            id,
            name: draft.name,
            phone: draft.phone,
            credit_limit_cents: draft.credit_limit_cents.max(0),
            current_debt_cents: 0,
            has_unlimited_credit: draft.has_unlimited_credit,
            created_at: Utc::now(),
        };
        self.customers.push(customer.clone());

        self.log_activity(
            "CREATE_CUSTOMER",
            format!("Created customer '{}' (#{})", customer.name, customer.id),
        );
        self.commit(&[keys::CUSTOMERS]);
        Ok(customer)
    }

    /// Replaces a customer wholesale, keeping the tracked debt balance.
    pub fn update_customer(&mut self, mut updated: Customer) -> StoreResult<Customer> {
        let slot = self
            .customers
            .iter_mut()
            .find(|c| c.id == updated.id)
            .ok_or_else(|| StoreError::not_found("Customer", &updated.id))?;

        // Debt moves only through sale and payment flows.
        updated.current_debt_cents = slot.current_debt_cents;
        updated.created_at = slot.created_at;
        *slot = updated.clone();

        self.log_activity(
            "UPDATE_CUSTOMER",
            format!("Updated customer '{}' (#{})", updated.name, updated.id),
        );
        self.commit(&[keys::CUSTOMERS]);
        Ok(updated)
    }

    pub fn delete_customer(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("Customer", id))?;
        let removed = self.customers.remove(index);
        if removed.current_debt_cents > 0 {
            warn!(
                customer = %removed.id,
                debt_cents = removed.current_debt_cents,
                "Deleted customer carried outstanding debt"
            );
        }

        self.log_activity(
            "DELETE_CUSTOMER",
            format!("Deleted customer '{}' (#{})", removed.name, removed.id),
        );
        self.commit(&[keys::CUSTOMERS]);
        Ok(())
    }

    /// Settles customer debt directly (outside any single sale).
    ///
    /// The balance clamps at zero; `to_register` books the cash into the
    /// drawer as a deposit.
    pub fn process_customer_payment(
        &mut self,
        customer_id: &str,
        amount_cents: i64,
        to_register: bool,
    ) -> StoreResult<Customer> {
        if amount_cents <= 0 {
            return Err(CoreError::NegativeAmount {
                field: "payment",
                value: amount_cents,
            }
            .into());
        }
        if !self.customers.iter().any(|c| c.id == customer_id) {
            return Err(StoreError::not_found("Customer", customer_id));
        }

        self.apply_debt_delta(customer_id, -amount_cents);
        if to_register {
            self.record_cash_movement(
                CashMovementKind::Deposit,
                amount_cents,
                format!("Debt payment from customer #{customer_id}"),
            );
        }

        let updated = self
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Customer", customer_id))?;

        self.log_activity(
            "CUSTOMER_PAYMENT",
            format!("Debt payment of {amount_cents} cents from customer #{customer_id}"),
        );
        self.commit(&[keys::CUSTOMERS, keys::CASH_MOVEMENTS]);
        Ok(updated)
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub fn add_supplier(
        &mut self,
        name: impl Into<String>,
        phone: Option<String>,
        notes: Option<String>,
    ) -> StoreResult<Supplier> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::Required { field: "name" }.into());
        }

        let id = next_sequence(
            self.suppliers.iter().map(|s| s.id.as_str()),
            self.settings.sequences.supplier_start,
        );
        let supplier = Supplier {
            id,
            name,
            phone,
            notes,
        };
        self.suppliers.push(supplier.clone());

        self.log_activity(
            "CREATE_SUPPLIER",
            format!("Created supplier '{}' (#{})", supplier.name, supplier.id),
        );
        self.commit(&[keys::SUPPLIERS]);
        Ok(supplier)
    }

    pub fn update_supplier(&mut self, updated: Supplier) -> StoreResult<Supplier> {
        let slot = self
            .suppliers
            .iter_mut()
            .find(|s| s.id == updated.id)
            .ok_or_else(|| StoreError::not_found("Supplier", &updated.id))?;
        *slot = updated.clone();

        self.log_activity(
            "UPDATE_SUPPLIER",
            format!("Updated supplier '{}' (#{})", updated.name, updated.id),
        );
        self.commit(&[keys::SUPPLIERS]);
        Ok(updated)
    }

    pub fn delete_supplier(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .suppliers
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found("Supplier", id))?;
        let removed = self.suppliers.remove(index);

        self.log_activity(
            "DELETE_SUPPLIER",
            format!("Deleted supplier '{}' (#{})", removed.name, removed.id),
        );
        self.commit(&[keys::SUPPLIERS]);
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Moves a customer's debt by a signed delta, clamping at zero.
    /// Missing customers are skipped (the account may have been deleted
    /// after the sale).
    pub(super) fn apply_debt_delta(&mut self, customer_id: &str, delta_cents: i64) {
        if let Some(customer) = self.customers.iter_mut().find(|c| c.id == customer_id) {
            customer.current_debt_cents = (customer.current_debt_cents + delta_cents).max(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::memory_store;
    use super::*;

    #[test]
    fn customer_ids_follow_the_sequence() {
        let mut store = memory_store();
        let a = store
            .add_customer(CustomerDraft {
                name: "Ana".into(),
                ..Default::default()
            })
            .unwrap();
        let b = store
            .add_customer(CustomerDraft {
                name: "Bo".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");
        assert_eq!(a.current_debt_cents, 0);
    }

    #[test]
    fn update_preserves_the_tracked_debt() {
        let mut store = memory_store();
        let customer = store
            .add_customer(CustomerDraft {
                name: "Ana".into(),
                has_unlimited_credit: true,
                ..Default::default()
            })
            .unwrap();
        store.apply_debt_delta(&customer.id, 500);

        let mut edited = customer.clone();
        edited.name = "Ana B".into();
        edited.current_debt_cents = 0; // caller cannot zero debt through update
        let updated = store.update_customer(edited).unwrap();
        assert_eq!(updated.current_debt_cents, 500);
    }

    #[test]
    fn debt_payment_clamps_at_zero_and_can_hit_the_register() {
        let mut store = memory_store();
        let customer = store
            .add_customer(CustomerDraft {
                name: "Ana".into(),
                has_unlimited_credit: true,
                ..Default::default()
            })
            .unwrap();
        store.apply_debt_delta(&customer.id, 300);

        let updated = store
            .process_customer_payment(&customer.id, 1_000, true)
            .unwrap();
        assert_eq!(updated.current_debt_cents, 0);
        assert_eq!(store.cash_balance(), 1_000);
    }

    #[test]
    fn zero_or_negative_payment_is_rejected() {
        let mut store = memory_store();
        let customer = store
            .add_customer(CustomerDraft {
                name: "Ana".into(),
                ..Default::default()
            })
            .unwrap();
        assert!(store.process_customer_payment(&customer.id, 0, false).is_err());
        assert!(store.process_customer_payment(&customer.id, -5, false).is_err());
    }

    #[test]
    fn suppliers_round_trip() {
        let mut store = memory_store();
        let supplier = store
            .add_supplier("Acme", Some("555-1234".into()), None)
            .unwrap();
        assert_eq!(supplier.id, "1");

        let mut edited = supplier.clone();
        edited.notes = Some("net 30".into());
        store.update_supplier(edited).unwrap();
        assert_eq!(store.suppliers()[0].notes.as_deref(), Some("net 30"));

        store.delete_supplier(&supplier.id).unwrap();
        assert!(store.suppliers().is_empty());
    }
}
