//! Product and category mutators.
//!
//! Stock never goes negative: adjustments clamp at zero. Variant-bearing
//! products keep the parent counter equal to the sum of variant stocks.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use vela_core::{next_sequence, Category, CoreError, Product, ProductVariant};

use crate::error::{StoreError, StoreResult};
use crate::storage::keys;

use super::EntityStore;

/// Input for creating a product. Missing fields take safe defaults.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: String,
    pub category_id: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock: i64,
    pub variants: Vec<ProductVariant>,
}

impl EntityStore {
    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product with the next sequenced id.
    pub fn add_product(&mut self, draft: ProductDraft) -> StoreResult<Product> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::Required { field: "name" }.into());
        }
        if draft.price_cents < 0 {
            return Err(CoreError::NegativeAmount {
                field: "price",
                value: draft.price_cents,
            }
            .into());
        }

        let id = next_sequence(
            self.products.iter().map(|p| p.id.as_str()),
            self.settings.sequences.product_start,
        );
        let now = Utc::now();
        let mut product = Product {
            id,
            name: draft.name,
            category_id: draft.category_id,
            price_cents: draft.price_cents,
            cost_cents: draft.cost_cents,
            stock: draft.stock.max(0),
            variants: draft.variants,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        product.reconcile_stock();

        self.products.push(product.clone());
        self.log_activity(
            "CREATE_PRODUCT",
            format!("Created product '{}' (#{})", product.name, product.id),
        );
        self.commit(&[keys::PRODUCTS]);
        Ok(product)
    }

    /// Replaces an existing product wholesale, refreshing `updated_at` and
    /// re-reconciling variant stock.
    pub fn update_product(&mut self, mut updated: Product) -> StoreResult<Product> {
        let slot = self
            .products
            .iter_mut()
            .find(|p| p.id == updated.id)
            .ok_or_else(|| StoreError::not_found("Product", &updated.id))?;

        updated.created_at = slot.created_at;
        updated.updated_at = Utc::now();
        updated.reconcile_stock();
        *slot = updated.clone();

        self.log_activity(
            "UPDATE_PRODUCT",
            format!("Updated product '{}' (#{})", updated.name, updated.id),
        );
        self.commit(&[keys::PRODUCTS]);
        Ok(updated)
    }

    /// Hard-removes a product. Past transactions keep their frozen line-item
    /// snapshots, so history survives the removal.
    pub fn delete_product(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;
        let removed = self.products.remove(index);

        self.log_activity(
            "DELETE_PRODUCT",
            format!("Deleted product '{}' (#{})", removed.name, removed.id),
        );
        self.commit(&[keys::PRODUCTS]);
        Ok(())
    }

    /// Adjusts stock by a signed delta, clamping at zero.
    ///
    /// With a variant id the delta lands on that variant and the parent
    /// counter is reconciled; without one it lands on the product counter.
    pub fn adjust_stock(
        &mut self,
        product_id: &str,
        variant_id: Option<&str>,
        delta: i64,
    ) -> StoreResult<i64> {
        let product = self
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| StoreError::not_found("Product", product_id))?;

        match variant_id {
            Some(vid) => {
                let variant = product
                    .variants
                    .iter_mut()
                    .find(|v| v.id == vid)
                    .ok_or_else(|| StoreError::not_found("Variant", vid))?;
                variant.stock = (variant.stock + delta).max(0);
                product.reconcile_stock();
            }
            None => {
                product.stock = (product.stock + delta).max(0);
            }
        }
        product.updated_at = Utc::now();
        let stock_after = product.stock;
        let name = product.name.clone();

        debug!(product_id, delta, stock_after, "Stock adjusted");
        self.log_activity(
            "ADJUST_STOCK",
            format!("Stock of '{name}' adjusted by {delta} to {stock_after}"),
        );
        self.commit(&[keys::PRODUCTS]);
        Ok(stock_after)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub fn add_category(&mut self, name: impl Into<String>) -> StoreResult<Category> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::Required { field: "name" }.into());
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name,
        };
        self.categories.push(category.clone());

        self.log_activity(
            "CREATE_CATEGORY",
            format!("Created category '{}'", category.name),
        );
        self.commit(&[keys::CATEGORIES]);
        Ok(category)
    }

    pub fn update_category(&mut self, id: &str, name: impl Into<String>) -> StoreResult<Category> {
        let name = name.into();
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("Category", id))?;
        category.name = name;
        let updated = category.clone();

        self.log_activity(
            "UPDATE_CATEGORY",
            format!("Renamed category to '{}'", updated.name),
        );
        self.commit(&[keys::CATEGORIES]);
        Ok(updated)
    }

    /// Removes a category and detaches it from any product referencing it.
    pub fn delete_category(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("Category", id))?;
        let removed = self.categories.remove(index);

        let mut touched_products = false;
        for product in &mut self.products {
            if product.category_id.as_deref() == Some(id) {
                product.category_id = None;
                touched_products = true;
            }
        }

        self.log_activity(
            "DELETE_CATEGORY",
            format!("Deleted category '{}'", removed.name),
        );
        if touched_products {
            self.commit(&[keys::CATEGORIES, keys::PRODUCTS]);
        } else {
            self.commit(&[keys::CATEGORIES]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::memory_store;
    use super::*;

    fn variant(id: &str, stock: i64) -> ProductVariant {
        ProductVariant {
            id: id.into(),
            name: id.to_uppercase(),
            price_cents: 1500,
            stock,
        }
    }

    #[test]
    fn product_ids_start_at_the_configured_offset() {
        let mut store = memory_store();
        let mut settings = store.settings().clone();
        settings.sequences.product_start = 100;
        store.update_settings(settings);

        let first = store
            .add_product(ProductDraft {
                name: "First".into(),
                ..Default::default()
            })
            .unwrap();
        let second = store
            .add_product(ProductDraft {
                name: "Second".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(first.id, "100");
        assert_eq!(second.id, "101");
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut store = memory_store();
        let err = store
            .add_product(ProductDraft {
                name: "   ".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::Required { field: "name" })
        ));
    }

    #[test]
    fn stock_adjustment_clamps_at_zero() {
        let mut store = memory_store();
        let product = store
            .add_product(ProductDraft {
                name: "Tea".into(),
                stock: 3,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(store.adjust_stock(&product.id, None, -10).unwrap(), 0);
        assert_eq!(store.adjust_stock(&product.id, None, 4).unwrap(), 4);
    }

    #[test]
    fn variant_adjustment_reconciles_the_parent() {
        let mut store = memory_store();
        let product = store
            .add_product(ProductDraft {
                name: "Shirt".into(),
                variants: vec![variant("s", 4), variant("m", 6)],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(product.stock, 10);

        store.adjust_stock(&product.id, Some("m"), -2).unwrap();
        let reloaded = store.products().iter().find(|p| p.id == product.id).unwrap();
        assert_eq!(reloaded.stock, 8);
        assert_eq!(
            reloaded.variants.iter().find(|v| v.id == "m").unwrap().stock,
            4
        );
    }

    #[test]
    fn deleting_a_category_detaches_products() {
        let mut store = memory_store();
        let category = store.add_category("Drinks").unwrap();
        let product = store
            .add_product(ProductDraft {
                name: "Tea".into(),
                category_id: Some(category.id.clone()),
                ..Default::default()
            })
            .unwrap();

        store.delete_category(&category.id).unwrap();
        assert!(store.categories().is_empty());
        let reloaded = store.products().iter().find(|p| p.id == product.id).unwrap();
        assert_eq!(reloaded.category_id, None);
    }

    #[test]
    fn unknown_product_yields_not_found() {
        let mut store = memory_store();
        let err = store.adjust_stock("999", None, 1).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Product", .. }));
    }
}
