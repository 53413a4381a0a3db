//! External collaborators: catalog reads and checkout creation.
//!
//! Both are traits so the session can run against the real commerce platform
//! ([`shopify::ShopifyClient`]) or in-memory doubles in tests.

pub mod shopify;

use async_trait::async_trait;

use crate::domain::aggregates::product::Product;
use crate::Result;

/// One page of catalog results.
#[derive(Clone, Debug)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A `(variant, quantity)` pair handed to checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutLine {
    pub variant_id: String,
    pub quantity: u32,
}

/// Opaque read source for products, variants, prices, and stock levels.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches a page of products, starting from `cursor` when given.
    async fn products_page(&self, cursor: Option<&str>) -> Result<ProductPage>;

    /// Full-text product search.
    async fn search(&self, query: &str) -> Result<Vec<Product>>;
}

/// Turns the current cart into an external checkout handoff URL.
#[async_trait]
pub trait CheckoutService: Send + Sync {
    async fn create_checkout(
        &self,
        lines: &[CheckoutLine],
        discount_code: Option<&str>,
    ) -> Result<String>;
}
