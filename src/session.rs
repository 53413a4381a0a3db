//! Storefront session
//!
//! Single-threaded coordinator over the cart, discount engine, bundle
//! selection, persistence, and the external catalog/checkout services.
//! Every cart or discount mutation reconciles the auto discount, mirrors
//! state to storage, and refreshes the checkout handoff; persistence and
//! checkout failures never roll back in-memory state.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::aggregates::bundle::BundleSelection;
use crate::domain::aggregates::cart::{Cart, LineItem};
use crate::domain::aggregates::discount::DiscountState;
use crate::domain::aggregates::product::{Category, Product};
use crate::domain::value_objects::Money;
use crate::services::{CatalogService, CheckoutLine, CheckoutService};
use crate::storage::{PersistenceAdapter, StateStore};
use crate::{Result, StorefrontError};

/// Upper bound on products held in the catalog snapshot.
pub const PRODUCT_FETCH_CAP: usize = 1000;

/// Subtotal at which shipping becomes free.
fn free_shipping_threshold() -> Decimal {
    Decimal::from(75)
}

/// Result of committing a bundle, for the confirmation surface.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleReceipt {
    pub units: u32,
    pub saved: Decimal,
}

/// Progress toward free shipping, derived from the cart subtotal.
#[derive(Clone, Debug, PartialEq)]
pub struct ShippingProgress {
    pub remaining: Decimal,
    /// 0–100.
    pub percent: Decimal,
}

pub struct StorefrontSession {
    cart: Cart,
    discount: DiscountState,
    bundle: BundleSelection,
    persistence: PersistenceAdapter,
    catalog: Arc<dyn CatalogService>,
    checkout: Arc<dyn CheckoutService>,
    products: Vec<Product>,
    handoff: Option<String>,
    checkout_seq: u64,
    checkout_pending: bool,
    initialized: bool,
}

impl StorefrontSession {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        checkout: Arc<dyn CheckoutService>,
        store: Box<dyn StateStore>,
    ) -> Self {
        Self {
            cart: Cart::new(),
            discount: DiscountState::default(),
            bundle: BundleSelection::new(),
            persistence: PersistenceAdapter::new(store),
            catalog,
            checkout,
            products: vec![],
            handoff: None,
            checkout_seq: 0,
            checkout_pending: false,
            initialized: false,
        }
    }

    /// Restores persisted cart and discount state. Until this has run, no
    /// state is mirrored back to storage, so a startup mutation can never
    /// clobber a real persisted cart with an empty one.
    ///
    /// The discount record is taken as-is: it was reconciled at the last
    /// mutation, and a reload is not a mutation. In particular, an auto
    /// discount the user removed from a qualifying cart stays removed until
    /// the cart is mutated again.
    pub async fn rehydrate(&mut self) {
        self.cart = Cart::from_items(self.persistence.load_cart());
        self.discount = self.persistence.load_discount();
        self.initialized = true;
        tracing::debug!(items = self.cart.item_count(), "session rehydrated");
        self.refresh_checkout().await;
    }

    // =========================================================================
    // Read side
    // =========================================================================

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn discount(&self) -> &DiscountState {
        &self.discount
    }

    pub fn bundle(&self) -> &BundleSelection {
        &self.bundle
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Cart subtotal with the active discount applied.
    pub fn total(&self) -> Money {
        let subtotal = self.cart.subtotal();
        Money::new(self.discount.compute_total(subtotal.amount), &subtotal.currency_code)
    }

    /// Current checkout handoff; `None` while loading, after a failure, or
    /// with an empty cart. Checkout must stay disabled while this is absent.
    pub fn checkout_url(&self) -> Option<&str> {
        self.handoff.as_deref()
    }

    pub fn checkout_ready(&self) -> bool {
        !self.checkout_pending && self.handoff.is_some()
    }

    pub fn shipping_progress(&self) -> ShippingProgress {
        let threshold = free_shipping_threshold();
        let total = self.cart.subtotal().amount;
        let remaining = (threshold - total).max(Decimal::ZERO);
        let percent = (total * Decimal::ONE_HUNDRED / threshold).min(Decimal::ONE_HUNDRED);
        ShippingProgress { remaining, percent }
    }

    /// Snapshot products filtered by category bucket and title substring.
    pub fn filtered_products(&self, category: Category, query: &str) -> Vec<&Product> {
        let query = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| category == Category::All || p.category == category)
            .filter(|p| query.is_empty() || p.title.to_lowercase().contains(&query))
            .collect()
    }

    // =========================================================================
    // Cart mutations
    // =========================================================================

    pub async fn add_item(&mut self, item: LineItem) {
        self.cart.add_item(item);
        self.after_cart_change().await;
    }

    pub async fn remove_item(&mut self, variant_id: &str) {
        self.cart.remove_item(variant_id);
        self.after_cart_change().await;
    }

    pub async fn set_quantity(&mut self, variant_id: &str, quantity: u32) {
        self.cart.set_quantity(variant_id, quantity);
        self.after_cart_change().await;
    }

    pub async fn clear_cart(&mut self) {
        self.cart.clear();
        self.after_cart_change().await;
    }

    // =========================================================================
    // Discount operations
    // =========================================================================

    /// Applies a manually entered code. Even a rejected unknown code changes
    /// display state, so persistence and checkout refresh run regardless.
    pub async fn apply_discount_code(&mut self, raw: &str) -> Result<()> {
        let result = self.discount.apply_code(raw, self.cart.item_count());
        self.persist();
        self.refresh_checkout().await;
        result
    }

    /// Removes the active discount, including the auto-applied one. It will
    /// re-apply at the next mutation that meets the threshold.
    pub async fn remove_discount_code(&mut self) {
        self.discount.remove_code();
        self.persist();
        self.refresh_checkout().await;
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Loads the product snapshot, paging until the catalog is exhausted or
    /// [`PRODUCT_FETCH_CAP`] is reached. A failed page aborts the whole load.
    pub async fn load_products(&mut self) -> Result<()> {
        let mut all: Vec<Product> = vec![];
        let mut cursor: Option<String> = None;

        loop {
            let page = match self.catalog.products_page(cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(error = %e, "catalog fetch failed");
                    return Err(StorefrontError::CatalogUnavailable);
                }
            };
            all.extend(page.products);
            if !page.has_next_page || all.len() >= PRODUCT_FETCH_CAP {
                break;
            }
            match page.end_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        all.truncate(PRODUCT_FETCH_CAP);
        tracing::debug!(count = all.len(), "catalog snapshot loaded");
        self.products = all;
        Ok(())
    }

    // =========================================================================
    // Bundle workflow
    // =========================================================================

    /// Stages one unit of a product's default variant from the snapshot.
    pub fn add_to_bundle(&mut self, product_id: &str) -> Result<()> {
        let product = self
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| StorefrontError::UnknownProduct(product_id.to_string()))?;
        let variant = product
            .first_variant()
            .cloned()
            .ok_or_else(|| StorefrontError::UnknownProduct(product_id.to_string()))?;
        self.bundle.add(&product, &variant)
    }

    pub fn update_bundle_quantity(&mut self, index: usize, delta: i32) -> Result<()> {
        self.bundle.update_quantity(index, delta)
    }

    pub fn remove_from_bundle(&mut self, index: usize) {
        self.bundle.remove(index);
    }

    pub fn reset_bundle(&mut self) {
        self.bundle.clear();
    }

    /// Commits the staged bundle into the cart, all or nothing.
    ///
    /// Only a complete bundle (exactly [`crate::BUNDLE_CAPACITY`] units) may
    /// commit. Every entry is re-validated against the catalog snapshot
    /// before anything touches the cart; a single stale entry rejects the
    /// whole commit with the selection intact. The resulting three-plus-item
    /// cart picks up the auto discount through the normal reconcile path, so
    /// bundle pricing needs no separate checkout logic.
    pub async fn commit_bundle(&mut self) -> Result<BundleReceipt> {
        if !self.bundle.is_complete() {
            return Err(StorefrontError::IncompleteBundle {
                staged: self.bundle.total_units(),
                expected: crate::BUNDLE_CAPACITY,
            });
        }
        self.bundle.validate_stock(&self.products)?;

        let units = self.bundle.total_units();
        let saved = self.bundle.total_price() - self.bundle.discounted_price();
        for item in self.bundle.to_line_items() {
            self.cart.add_item(item);
        }
        self.bundle.clear();
        self.after_cart_change().await;

        Ok(BundleReceipt { units, saved })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn after_cart_change(&mut self) {
        self.discount.reconcile(self.cart.item_count());
        self.persist();
        self.refresh_checkout().await;
    }

    fn persist(&mut self) {
        if !self.initialized {
            return;
        }
        self.persistence.save_cart(self.cart.items());
        self.persistence.save_discount(&self.discount);
    }

    /// Requests a fresh checkout handoff for the current cart + discount.
    ///
    /// Each request is tagged with a sequence number; a response that comes
    /// back after a newer request has been issued is discarded instead of
    /// overwriting the handoff with stale data. With refreshes awaited inline
    /// under `&mut self` the sequence can't advance mid-request; the guard
    /// becomes load-bearing only if refreshes are ever spawned concurrently.
    async fn refresh_checkout(&mut self) {
        self.checkout_seq += 1;
        let seq = self.checkout_seq;

        if self.cart.is_empty() {
            self.handoff = None;
            self.checkout_pending = false;
            return;
        }

        self.checkout_pending = true;
        let lines: Vec<CheckoutLine> = self
            .cart
            .items()
            .iter()
            .map(|i| CheckoutLine { variant_id: i.variant_id.clone(), quantity: i.quantity })
            .collect();
        let code = self.discount.active_code().map(str::to_owned);

        let result = self.checkout.create_checkout(&lines, code.as_deref()).await;

        if seq != self.checkout_seq {
            tracing::debug!(seq, current = self.checkout_seq, "discarding stale checkout response");
            return;
        }
        self.checkout_pending = false;
        match result {
            Ok(url) => self.handoff = Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "checkout creation failed");
                self.handoff = None;
            }
        }
    }
}
