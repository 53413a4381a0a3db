//! Bundle Aggregate
//!
//! Staging area for the build-a-bundle workflow: up to three total units
//! across up to three distinct products, committed to the cart only when
//! exactly three units are staged. Never persisted; the selection dies with
//! the page.

use rust_decimal::Decimal;

use crate::domain::aggregates::cart::LineItem;
use crate::domain::aggregates::product::{Product, Variant};
use crate::{Result, StorefrontError};

/// Total units a bundle holds when complete.
pub const BUNDLE_CAPACITY: u32 = 3;

/// Fixed amount taken off a complete bundle.
pub fn bundle_discount() -> Decimal {
    Decimal::TEN
}

#[derive(Clone, Debug, PartialEq)]
pub struct BundleEntry {
    pub product: Product,
    pub variant: Variant,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BundleSelection {
    entries: Vec<BundleEntry>,
}

impl BundleSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_units(&self) -> u32 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.total_units() == BUNDLE_CAPACITY
    }

    /// Stages one unit of `variant`, merging with an already-staged entry for
    /// the same product. Rejections leave the selection unchanged:
    /// out-of-stock variants, increments past available stock, and anything
    /// that would push the total past [`BUNDLE_CAPACITY`].
    pub fn add(&mut self, product: &Product, variant: &Variant) -> Result<()> {
        if !variant.in_stock() {
            return Err(StorefrontError::OutOfStock { title: product.title.clone() });
        }

        if let Some(pos) = self.entries.iter().position(|e| e.product.id == product.id) {
            let next_quantity = self.entries[pos].quantity + 1;
            if variant.quantity_available < i64::from(next_quantity) {
                return Err(StorefrontError::InsufficientStock {
                    title: product.title.clone(),
                    available: variant.quantity_available,
                });
            }
            if self.total_units() + 1 > BUNDLE_CAPACITY {
                return Err(StorefrontError::BundleFull { capacity: BUNDLE_CAPACITY });
            }
            self.entries[pos].quantity = next_quantity;
            return Ok(());
        }

        if self.total_units() >= BUNDLE_CAPACITY {
            return Err(StorefrontError::BundleFull { capacity: BUNDLE_CAPACITY });
        }
        self.entries.push(BundleEntry {
            product: product.clone(),
            variant: variant.clone(),
            quantity: 1,
        });
        Ok(())
    }

    /// Adjusts a staged quantity by `delta`, with the same stock and capacity
    /// checks as [`add`](Self::add). A candidate quantity below one removes
    /// the entry.
    pub fn update_quantity(&mut self, index: usize, delta: i32) -> Result<()> {
        let entry = self
            .entries
            .get(index)
            .ok_or(StorefrontError::EntryNotFound(index))?;
        let candidate = i64::from(entry.quantity) + i64::from(delta);

        if candidate > entry.variant.quantity_available {
            return Err(StorefrontError::InsufficientStock {
                title: entry.product.title.clone(),
                available: entry.variant.quantity_available,
            });
        }
        let candidate_total = i64::from(self.total_units()) + i64::from(delta);
        if candidate_total > i64::from(BUNDLE_CAPACITY) {
            return Err(StorefrontError::BundleFull { capacity: BUNDLE_CAPACITY });
        }

        if candidate < 1 {
            self.entries.remove(index);
        } else {
            self.entries[index].quantity = candidate as u32;
        }
        Ok(())
    }

    /// Deletes a staged entry unconditionally.
    pub fn remove(&mut self, index: usize) -> Option<BundleEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sum of staged unit prices times quantities.
    pub fn total_price(&self) -> Decimal {
        self.entries
            .iter()
            .fold(Decimal::ZERO, |acc, e| acc + e.variant.price.amount * Decimal::from(e.quantity))
    }

    /// Bundle price with the fixed discount, applied only when complete.
    pub fn discounted_price(&self) -> Decimal {
        let total = self.total_price();
        if self.is_complete() {
            total - bundle_discount()
        } else {
            total
        }
    }

    /// Re-validates every staged entry against a fresh catalog snapshot.
    /// Entries whose variant no longer appears in the snapshot are checked
    /// against the stock level captured at staging time.
    pub fn validate_stock(&self, snapshot: &[Product]) -> Result<()> {
        for entry in &self.entries {
            let available = snapshot
                .iter()
                .flat_map(|p| p.variants.iter())
                .find(|v| v.id == entry.variant.id)
                .map(|v| v.quantity_available)
                .unwrap_or(entry.variant.quantity_available);
            if available < i64::from(entry.quantity) {
                return Err(StorefrontError::InsufficientStock {
                    title: entry.product.title.clone(),
                    available,
                });
            }
        }
        Ok(())
    }

    /// Cart lines for the staged entries, in staging order.
    pub fn to_line_items(&self) -> Vec<LineItem> {
        self.entries
            .iter()
            .map(|e| LineItem {
                variant_id: e.variant.id.clone(),
                product_id: e.product.id.clone(),
                title: e.product.title.clone(),
                variant_title: e.variant.display_title(),
                unit_price: e.variant.price.clone(),
                image: e.product.featured_image.clone(),
                quantity: e.quantity,
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::aggregates::product::{Category, SelectedOption};
    use crate::domain::value_objects::{Image, Money};

    pub(crate) fn product(id: &str, title: &str, amount: Decimal, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            category: Category::from_title(title),
            title: title.to_string(),
            handle: title.to_lowercase().replace(' ', "-"),
            featured_image: Image::new("https://cdn.example.com/p.jpg", title),
            variants: vec![Variant {
                id: format!("{id}-v1"),
                title: "8 oz".to_string(),
                price: Money::usd(amount),
                compare_at_price: None,
                selected_options: vec![SelectedOption { name: "Size".into(), value: "8 oz".into() }],
                quantity_available: stock,
            }],
        }
    }

    fn add_first_variant(bundle: &mut BundleSelection, p: &Product) -> Result<()> {
        let variant = p.first_variant().cloned().unwrap();
        bundle.add(p, &variant)
    }

    #[test]
    fn test_out_of_stock_rejected() {
        let mut bundle = BundleSelection::new();
        let p = product("p1", "Monstera Food", Decimal::new(20, 0), 0);
        let err = add_first_variant(&mut bundle, &p).unwrap_err();
        assert!(matches!(err, StorefrontError::OutOfStock { .. }));
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_increment_past_stock_rejected() {
        let mut bundle = BundleSelection::new();
        let p = product("p1", "Monstera Food", Decimal::new(20, 0), 1);
        add_first_variant(&mut bundle, &p).unwrap();

        let before = bundle.clone();
        let err = add_first_variant(&mut bundle, &p).unwrap_err();
        assert!(matches!(err, StorefrontError::InsufficientStock { available: 1, .. }));
        assert_eq!(bundle, before);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut bundle = BundleSelection::new();
        let a = product("p1", "Monstera Food", Decimal::new(20, 0), 10);
        let b = product("p2", "Tomato Feed", Decimal::new(15, 0), 10);
        add_first_variant(&mut bundle, &a).unwrap();
        add_first_variant(&mut bundle, &a).unwrap();
        add_first_variant(&mut bundle, &b).unwrap();
        assert_eq!(bundle.total_units(), 3);

        let before = bundle.clone();
        let err = add_first_variant(&mut bundle, &b).unwrap_err();
        assert!(matches!(err, StorefrontError::BundleFull { capacity: 3 }));
        assert_eq!(bundle, before);

        let c = product("p3", "Lotus Feed", Decimal::new(12, 0), 10);
        let err = add_first_variant(&mut bundle, &c).unwrap_err();
        assert!(matches!(err, StorefrontError::BundleFull { capacity: 3 }));
        assert_eq!(bundle, before);
    }

    #[test]
    fn test_update_quantity_checks_and_removal() {
        let mut bundle = BundleSelection::new();
        let a = product("p1", "Monstera Food", Decimal::new(20, 0), 2);
        add_first_variant(&mut bundle, &a).unwrap();

        // Past stock.
        bundle.update_quantity(0, 1).unwrap();
        let err = bundle.update_quantity(0, 1).unwrap_err();
        assert!(matches!(err, StorefrontError::InsufficientStock { .. }));
        assert_eq!(bundle.total_units(), 2);

        // Down to zero removes.
        bundle.update_quantity(0, -2).unwrap();
        assert!(bundle.is_empty());

        let err = bundle.update_quantity(0, 1).unwrap_err();
        assert!(matches!(err, StorefrontError::EntryNotFound(0)));
    }

    #[test]
    fn test_update_quantity_respects_capacity_across_entries() {
        let mut bundle = BundleSelection::new();
        let a = product("p1", "Monstera Food", Decimal::new(20, 0), 10);
        let b = product("p2", "Tomato Feed", Decimal::new(15, 0), 10);
        add_first_variant(&mut bundle, &a).unwrap();
        add_first_variant(&mut bundle, &a).unwrap();
        add_first_variant(&mut bundle, &b).unwrap();

        let err = bundle.update_quantity(1, 1).unwrap_err();
        assert!(matches!(err, StorefrontError::BundleFull { .. }));
        assert_eq!(bundle.total_units(), 3);
    }

    #[test]
    fn test_pricing_preview() {
        let mut bundle = BundleSelection::new();
        let a = product("p1", "Monstera Food", Decimal::new(20, 0), 10);
        let b = product("p2", "Tomato Feed", Decimal::new(15, 0), 10);
        add_first_variant(&mut bundle, &a).unwrap();
        add_first_variant(&mut bundle, &b).unwrap();
        // Incomplete: no discount.
        assert_eq!(bundle.total_price(), Decimal::new(35, 0));
        assert_eq!(bundle.discounted_price(), Decimal::new(35, 0));

        add_first_variant(&mut bundle, &a).unwrap();
        assert_eq!(bundle.total_price(), Decimal::new(55, 0));
        assert_eq!(bundle.discounted_price(), Decimal::new(45, 0));
    }

    #[test]
    fn test_validate_stock_against_fresh_snapshot() {
        let mut bundle = BundleSelection::new();
        let a = product("p1", "Monstera Food", Decimal::new(20, 0), 5);
        add_first_variant(&mut bundle, &a).unwrap();
        add_first_variant(&mut bundle, &a).unwrap();

        let fresh_ok = vec![product("p1", "Monstera Food", Decimal::new(20, 0), 2)];
        bundle.validate_stock(&fresh_ok).unwrap();

        // Stock dropped to 1 since staging.
        let fresh_bad = vec![product("p1", "Monstera Food", Decimal::new(20, 0), 1)];
        let err = bundle.validate_stock(&fresh_bad).unwrap_err();
        assert!(matches!(err, StorefrontError::InsufficientStock { available: 1, .. }));
    }

    #[test]
    fn test_to_line_items() {
        let mut bundle = BundleSelection::new();
        let a = product("p1", "Monstera Food", Decimal::new(20, 0), 10);
        add_first_variant(&mut bundle, &a).unwrap();
        add_first_variant(&mut bundle, &a).unwrap();

        let lines = bundle.to_line_items();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].variant_id, "p1-v1");
        assert_eq!(lines[0].variant_title, "8 oz");
        assert_eq!(lines[0].quantity, 2);
    }
}
