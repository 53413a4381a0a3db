//! TPS Storefront Core
//!
//! Cart, discount, and bundle engine for a headless plant-nutrient storefront.
//! The commerce platform owns catalog, inventory, pricing, and checkout; this
//! crate owns the client-side state that has to stay consistent with them:
//!
//! - a line-item cart keyed by variant id,
//! - a threshold-triggered promotional discount reconciled on every mutation,
//! - a fixed-size bundle picker (exactly 3 units) with stock-aware limits,
//! - a checkout handoff URL derived from cart + discount state,
//! - durable client-side persistence with corruption recovery.
//!
//! [`session::StorefrontSession`] wires these together; the aggregates under
//! [`domain`] are pure and testable on their own.

pub mod domain;
pub mod services;
pub mod session;
pub mod storage;

pub use domain::aggregates::bundle::{BundleEntry, BundleSelection, BUNDLE_CAPACITY};
pub use domain::aggregates::cart::{Cart, LineItem};
pub use domain::aggregates::discount::{DiscountState, AUTO_DISCOUNT_CODE};
pub use domain::aggregates::product::{Category, Product, Variant};
pub use domain::value_objects::{Image, Money};
pub use services::shopify::{ShopifyClient, StorefrontConfig};
pub use services::{CatalogService, CheckoutLine, CheckoutService, ProductPage};
pub use session::{BundleReceipt, StorefrontSession};
pub use storage::{MemoryStore, PersistenceAdapter, StateStore};

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{title} is out of stock")]
    OutOfStock { title: String },

    #[error("only {available} units of {title} available")]
    InsufficientStock { title: String, available: i64 },

    #[error("bundle is limited to {capacity} total units")]
    BundleFull { capacity: u32 },

    #[error("bundle needs exactly {expected} units, has {staged}")]
    IncompleteBundle { staged: u32, expected: u32 },

    #[error("no bundle entry at index {0}")]
    EntryNotFound(usize),

    #[error("invalid code")]
    InvalidCode,

    #[error("insufficient items for this code")]
    IneligibleCode,

    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error("could not load products")]
    CatalogUnavailable,

    #[error("checkout unavailable: {0}")]
    CheckoutFailed(String),

    #[error("storefront API error: {0}")]
    Api(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
