//! Cart Aggregate
//!
//! Line-item ledger keyed by variant id. Mutations are synchronous and always
//! leave the cart valid: at most one line per variant, every quantity >= 1.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Image, Money};

/// One cart entry for a purchasable variant.
///
/// Serialized in the layout the storefront has always persisted
/// (`variantId`, `price`, camelCase throughout), so carts written by older
/// clients rehydrate unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub variant_id: String,
    pub product_id: String,
    pub title: String,
    pub variant_title: String,
    #[serde(rename = "price")]
    pub unit_price: Money,
    pub image: Image,
    pub quantity: u32,
}

impl LineItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Clone, Debug)]
pub struct Cart {
    id: String,
    items: Vec<LineItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            items: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Rebuilds a cart from persisted line items. Zero-quantity lines and
    /// duplicate variant ids are merged away rather than trusted.
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            if item.quantity > 0 {
                cart.add_item(item);
            }
        }
        cart
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Number of distinct lines (for display).
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    pub fn subtotal(&self) -> Money {
        let currency = self
            .items
            .first()
            .map(|i| i.unit_price.currency_code.as_str())
            .unwrap_or("USD");
        let amount = self
            .items
            .iter()
            .fold(Decimal::ZERO, |acc, i| acc + i.line_total().amount);
        Money::new(amount, currency)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Adds a line, merging into an existing line with the same variant id.
    pub fn add_item(&mut self, item: LineItem) {
        if item.quantity == 0 {
            return;
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.variant_id == item.variant_id) {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        self.touch();
    }

    /// Removes the line for `variant_id`; no-op when absent.
    pub fn remove_item(&mut self, variant_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.variant_id != variant_id);
        let removed = self.items.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Replaces the stored quantity; zero removes the line. No-op when the
    /// variant is not in the cart.
    pub fn set_quantity(&mut self, variant_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove_item(variant_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.variant_id == variant_id) {
            item.quantity = quantity;
            self.touch();
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
