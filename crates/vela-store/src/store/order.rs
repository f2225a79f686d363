//! Order and purchase mutators.
//!
//! Orders move monotonically forward through their lifecycle; a completed or
//! cancelled order is frozen. The incoming-order slot is the depth-1 hand-off
//! between the order screen and the register: sending overwrites, taking
//! consumes.

use chrono::Utc;
use tracing::info;

use vela_core::{
    next_sequence, CashMovementKind, CoreError, Order, OrderItem, OrderStatus, Purchase,
    PurchaseItem,
};

use crate::error::{StoreError, StoreResult};
use crate::storage::keys;

use super::EntityStore;

/// Input for creating a customer order.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
}

/// Input for recording a supplier purchase.
#[derive(Debug, Clone, Default)]
pub struct PurchaseDraft {
    pub supplier_id: Option<String>,
    pub items: Vec<PurchaseItem>,
}

impl EntityStore {
    // =========================================================================
    // Orders
    // =========================================================================

    /// Creates an order in `PENDING` with the next sequenced id.
    pub fn add_order(&mut self, draft: OrderDraft) -> StoreResult<Order> {
        if draft.items.is_empty() {
            return Err(CoreError::Required { field: "items" }.into());
        }

        let id = next_sequence(
            self.orders.iter().map(|o| o.id.as_str()),
            self.settings.sequences.order_start,
        );
        let now = Utc::now();
        let order = Order {
            id,
            customer_name: draft.customer_name,
            items: draft.items,
            status: OrderStatus::Pending,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };
        self.orders.push(order.clone());

        self.log_activity(
            "CREATE_ORDER",
            format!("Created order #{} for '{}'", order.id, order.customer_name),
        );
        self.commit(&[keys::ORDERS]);
        Ok(order)
    }

    /// Edits an order's contents. The lifecycle state only moves through
    /// [`EntityStore::update_order_status`].
    pub fn update_order(&mut self, mut updated: Order) -> StoreResult<Order> {
        let slot = self
            .orders
            .iter_mut()
            .find(|o| o.id == updated.id)
            .ok_or_else(|| StoreError::not_found("Order", &updated.id))?;

        updated.status = slot.status;
        updated.created_at = slot.created_at;
        updated.updated_at = Utc::now();
        *slot = updated.clone();

        self.log_activity("UPDATE_ORDER", format!("Updated order #{}", updated.id));
        self.commit(&[keys::ORDERS]);
        Ok(updated)
    }

    /// Advances an order's lifecycle. Transitions run forward only;
    /// `CANCELLED` is reachable from any non-terminal state.
    pub fn update_order_status(&mut self, id: &str, next: OrderStatus) -> StoreResult<Order> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;

        if !order.status.can_transition_to(next) {
            return Err(CoreError::InvalidStatusTransition {
                from: order.status,
                to: next,
            }
            .into());
        }
        order.status = next;
        order.updated_at = Utc::now();
        let updated = order.clone();

        self.log_activity(
            "UPDATE_ORDER_STATUS",
            format!("Order #{id} moved to {next:?}"),
        );
        self.commit(&[keys::ORDERS]);
        Ok(updated)
    }

    pub fn delete_order(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        self.orders.remove(index);

        self.log_activity("DELETE_ORDER", format!("Deleted order #{id}"));
        self.commit(&[keys::ORDERS]);
        Ok(())
    }

    // =========================================================================
    // Incoming-order hand-off (depth-1 slot)
    // =========================================================================

    /// Places an order in the register's incoming slot, replacing whatever
    /// was there.
    pub fn send_order_to_pos(&mut self, order_id: &str) -> StoreResult<()> {
        let order = self
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Order", order_id))?;

        if self.incoming_order.is_some() {
            info!(order = order_id, "Replacing pending incoming order");
        }
        self.incoming_order = Some(order);

        self.log_activity(
            "SEND_ORDER_TO_POS",
            format!("Order #{order_id} sent to register"),
        );
        self.commit(&[keys::INCOMING_ORDER]);
        Ok(())
    }

    /// Consumes the incoming slot, if occupied.
    pub fn take_incoming_order(&mut self) -> Option<Order> {
        let taken = self.incoming_order.take();
        if taken.is_some() {
            self.commit(&[keys::INCOMING_ORDER]);
        }
        taken
    }

    /// Empties the incoming slot without consuming it anywhere.
    pub fn clear_incoming_order(&mut self) {
        if self.incoming_order.take().is_some() {
            self.commit(&[keys::INCOMING_ORDER]);
        }
    }

    // =========================================================================
    // Purchases (restocking)
    // =========================================================================

    /// Records a supplier purchase: restocks every line and books the total
    /// as a register `EXPENSE`.
    pub fn add_purchase(&mut self, draft: PurchaseDraft) -> StoreResult<Purchase> {
        if draft.items.is_empty() {
            return Err(CoreError::Required { field: "items" }.into());
        }

        let total_cents: i64 = draft
            .items
            .iter()
            .map(|i| i.unit_cost_cents * i.quantity)
            .sum();
        let id = next_sequence(
            self.purchases.iter().map(|p| p.id.as_str()),
            self.settings.sequences.purchase_start,
        );
        let purchase = Purchase {
            id: id.clone(),
            supplier_id: draft.supplier_id,
            items: draft.items,
            total_cents,
            created_at: Utc::now(),
        };
        self.purchases.push(purchase.clone());

        for item in &purchase.items {
            self.apply_stock_delta(&item.product_id, item.variant_id.as_deref(), item.quantity);
        }
        if total_cents > 0 {
            self.record_cash_movement(
                CashMovementKind::Expense,
                total_cents,
                format!("Purchase #{id}"),
            );
        }

        self.log_activity(
            "CREATE_PURCHASE",
            format!("Purchase #{id} for {total_cents} cents"),
        );
        self.commit(&[keys::PURCHASES, keys::PRODUCTS, keys::CASH_MOVEMENTS]);
        Ok(purchase)
    }
}

#[cfg(test)]
mod tests {
    use super::super::product::ProductDraft;
    use super::super::testutil::memory_store;
    use super::*;

    fn order_item(product_id: &str) -> OrderItem {
        OrderItem {
            product_id: product_id.into(),
            name: "Coffee".into(),
            quantity: 2,
            unit_price_cents: 350,
        }
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            customer_name: "Ana".into(),
            items: vec![order_item("1")],
            notes: None,
        }
    }

    #[test]
    fn orders_start_pending_and_total_from_items() {
        let mut store = memory_store();
        let order = store.add_order(draft()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents(), 700);
        assert_eq!(order.id, "1");
    }

    #[test]
    fn status_moves_forward_only() {
        let mut store = memory_store();
        let order = store.add_order(draft()).unwrap();

        store
            .update_order_status(&order.id, OrderStatus::InProgress)
            .unwrap();
        let err = store
            .update_order_status(&order.id, OrderStatus::Pending)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::InvalidStatusTransition { .. })
        ));

        store
            .update_order_status(&order.id, OrderStatus::Completed)
            .unwrap();
        // Terminal: even cancel is rejected now.
        assert!(store
            .update_order_status(&order.id, OrderStatus::Cancelled)
            .is_err());
    }

    #[test]
    fn incoming_slot_holds_exactly_one_order() {
        let mut store = memory_store();
        let first = store.add_order(draft()).unwrap();
        let second = store
            .add_order(OrderDraft {
                customer_name: "Bo".into(),
                ..draft()
            })
            .unwrap();

        store.send_order_to_pos(&first.id).unwrap();
        store.send_order_to_pos(&second.id).unwrap();

        // The second send overwrote the first.
        let taken = store.take_incoming_order().unwrap();
        assert_eq!(taken.id, second.id);
        assert!(store.take_incoming_order().is_none());
    }

    #[test]
    fn clear_empties_the_slot() {
        let mut store = memory_store();
        let order = store.add_order(draft()).unwrap();
        store.send_order_to_pos(&order.id).unwrap();
        store.clear_incoming_order();
        assert!(store.incoming_order().is_none());
    }

    #[test]
    fn purchase_restocks_and_books_an_expense() {
        let mut store = memory_store();
        let product = store
            .add_product(ProductDraft {
                name: "Coffee".into(),
                stock: 2,
                ..Default::default()
            })
            .unwrap();

        let purchase = store
            .add_purchase(PurchaseDraft {
                supplier_id: None,
                items: vec![PurchaseItem {
                    product_id: product.id.clone(),
                    variant_id: None,
                    quantity: 10,
                    unit_cost_cents: 200,
                }],
            })
            .unwrap();

        assert_eq!(purchase.total_cents, 2_000);
        assert_eq!(store.products()[0].stock, 12);
        assert_eq!(store.cash_balance(), -2_000);
    }

    #[test]
    fn order_edit_cannot_skip_the_status_gate() {
        let mut store = memory_store();
        let order = store.add_order(draft()).unwrap();

        let mut edited = order.clone();
        edited.status = OrderStatus::Completed;
        edited.notes = Some("rush".into());
        let updated = store.update_order(edited).unwrap();

        assert_eq!(updated.status, OrderStatus::Pending);
        assert_eq!(updated.notes.as_deref(), Some("rush"));
    }
}
