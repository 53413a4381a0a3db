//! Shopify Storefront API client.
//!
//! Catalog reads go through the GraphQL Storefront API; checkout handoffs are
//! cart permalinks on the store domain, so checkout itself never leaves the
//! commerce platform.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::aggregates::product::{Category, Product, SelectedOption, Variant};
use crate::domain::value_objects::{Image, Money};
use crate::services::{CatalogService, CheckoutLine, CheckoutService, ProductPage};
use crate::{Result, StorefrontError};

/// Products fetched per catalog page.
pub const CATALOG_PAGE_SIZE: u32 = 100;

/// Results returned for a search query.
pub const SEARCH_PAGE_SIZE: u32 = 10;

const GID_VARIANT_PREFIX: &str = "gid://shopify/ProductVariant/";
const PLACEHOLDER_IMAGE: &str = "/placeholder-image.jpg";

#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    /// Store origin, e.g. `https://checkout.tpsplantfoods.com`.
    pub store_domain: String,
    /// Public storefront access token.
    pub access_token: String,
    /// API version segment, e.g. `2024-01`.
    pub api_version: String,
}

impl StorefrontConfig {
    pub fn new(store_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            store_domain: store_domain.into(),
            access_token: access_token.into(),
            api_version: "2024-01".to_string(),
        }
    }

    /// Reads `SHOPIFY_STORE_DOMAIN` and `SHOPIFY_STOREFRONT_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let store_domain = std::env::var("SHOPIFY_STORE_DOMAIN")
            .map_err(|_| StorefrontError::Config("SHOPIFY_STORE_DOMAIN not set".to_string()))?;
        let access_token = std::env::var("SHOPIFY_STOREFRONT_ACCESS_TOKEN").map_err(|_| {
            StorefrontError::Config("SHOPIFY_STOREFRONT_ACCESS_TOKEN not set".to_string())
        })?;
        Ok(Self::new(store_domain, access_token))
    }

    fn graphql_endpoint(&self) -> String {
        format!(
            "{}/api/{}/graphql.json",
            self.store_domain.trim_end_matches('/'),
            self.api_version
        )
    }
}

pub struct ShopifyClient {
    http: reqwest::Client,
    config: StorefrontConfig,
}

// =============================================================================
// GraphQL wire types
// =============================================================================

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductConnection {
    #[serde(default)]
    page_info: Option<PageInfo>,
    edges: Vec<Edge<WireProduct>>,
}

#[derive(Deserialize)]
struct ProductsData {
    products: ProductConnection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    id: String,
    title: String,
    handle: String,
    featured_image: Option<WireImage>,
    variants: VariantConnection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireImage {
    url: String,
    alt_text: Option<String>,
}

#[derive(Deserialize)]
struct VariantConnection {
    edges: Vec<Edge<WireVariant>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVariant {
    id: String,
    title: String,
    price: Money,
    #[serde(default)]
    compare_at_price: Option<Money>,
    #[serde(default)]
    selected_options: Vec<SelectedOption>,
    #[serde(default)]
    quantity_available: Option<i64>,
}

impl WireProduct {
    fn into_product(self) -> Product {
        let featured_image = match self.featured_image {
            Some(img) => Image::new(img.url, img.alt_text.unwrap_or_else(|| self.title.clone())),
            None => Image::new(PLACEHOLDER_IMAGE, self.title.clone()),
        };
        Product {
            category: Category::from_title(&self.title),
            variants: self
                .variants
                .edges
                .into_iter()
                .map(|e| Variant {
                    id: e.node.id,
                    title: e.node.title,
                    price: e.node.price,
                    compare_at_price: e.node.compare_at_price,
                    selected_options: e.node.selected_options,
                    quantity_available: e.node.quantity_available.unwrap_or(0),
                })
                .collect(),
            id: self.id,
            title: self.title,
            handle: self.handle,
            featured_image,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

const PRODUCTS_QUERY: &str = r#"
query Products($first: Int!, $cursor: String) {
  products(first: $first, after: $cursor) {
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        id
        title
        handle
        featuredImage {
          url
          altText
        }
        variants(first: 10) {
          edges {
            node {
              id
              title
              price {
                amount
                currencyCode
              }
              compareAtPrice {
                amount
                currencyCode
              }
              selectedOptions {
                name
                value
              }
              quantityAvailable
            }
          }
        }
      }
    }
  }
}
"#;

const SEARCH_QUERY: &str = r#"
query SearchProducts($first: Int!, $query: String!) {
  products(first: $first, query: $query) {
    edges {
      node {
        id
        title
        handle
        featuredImage {
          url
          altText
        }
        variants(first: 10) {
          edges {
            node {
              id
              title
              price {
                amount
                currencyCode
              }
              compareAtPrice {
                amount
                currencyCode
              }
              selectedOptions {
                name
                value
              }
              quantityAvailable
            }
          }
        }
      }
    }
  }
}
"#;

impl ShopifyClient {
    pub fn new(config: StorefrontConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    async fn graphql(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value> {
        let response: GraphQlResponse = self
            .http
            .post(self.config.graphql_endpoint())
            .header("X-Shopify-Storefront-Access-Token", &self.config.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(errors) = response.errors {
            let joined = errors.into_iter().map(|e| e.message).collect::<Vec<_>>().join("; ");
            return Err(StorefrontError::Api(joined));
        }
        response
            .data
            .ok_or_else(|| StorefrontError::Api("response missing data".to_string()))
    }

    fn parse_page(data: serde_json::Value) -> Result<ProductPage> {
        let parsed: ProductsData = serde_json::from_value(data)?;
        let (has_next_page, end_cursor) = parsed
            .products
            .page_info
            .map(|p| (p.has_next_page, p.end_cursor))
            .unwrap_or((false, None));
        Ok(ProductPage {
            products: parsed.products.edges.into_iter().map(|e| e.node.into_product()).collect(),
            has_next_page,
            end_cursor,
        })
    }
}

#[async_trait]
impl CatalogService for ShopifyClient {
    async fn products_page(&self, cursor: Option<&str>) -> Result<ProductPage> {
        let data = self
            .graphql(
                PRODUCTS_QUERY,
                json!({ "first": CATALOG_PAGE_SIZE, "cursor": cursor }),
            )
            .await?;
        Self::parse_page(data)
    }

    async fn search(&self, query: &str) -> Result<Vec<Product>> {
        let data = self
            .graphql(SEARCH_QUERY, json!({ "first": SEARCH_PAGE_SIZE, "query": query }))
            .await?;
        Ok(Self::parse_page(data)?.products)
    }
}

#[async_trait]
impl CheckoutService for ShopifyClient {
    /// Builds a cart permalink: `{domain}/cart/{id}:{qty},...[?discount=CODE]`.
    async fn create_checkout(
        &self,
        lines: &[CheckoutLine],
        discount_code: Option<&str>,
    ) -> Result<String> {
        if lines.is_empty() {
            return Err(StorefrontError::CheckoutFailed("cart is empty".to_string()));
        }

        let cart_path = lines
            .iter()
            .map(|l| format!("{}:{}", strip_variant_gid(&l.variant_id), l.quantity))
            .collect::<Vec<_>>()
            .join(",");
        let base = format!(
            "{}/cart/{}",
            self.config.store_domain.trim_end_matches('/'),
            cart_path
        );
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| StorefrontError::CheckoutFailed(e.to_string()))?;
        if let Some(code) = discount_code.filter(|c| !c.is_empty()) {
            url.query_pairs_mut().append_pair("discount", code);
        }
        Ok(url.to_string())
    }
}

/// Variant ids arrive either as full gids or bare numeric ids; permalinks
/// want the bare form.
fn strip_variant_gid(variant_id: &str) -> &str {
    variant_id.strip_prefix(GID_VARIANT_PREFIX).unwrap_or(variant_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ShopifyClient {
        ShopifyClient::new(StorefrontConfig::new("https://checkout.example.com", "token"))
    }

    #[test]
    fn test_graphql_endpoint() {
        let config = StorefrontConfig::new("https://checkout.example.com/", "token");
        assert_eq!(
            config.graphql_endpoint(),
            "https://checkout.example.com/api/2024-01/graphql.json"
        );
    }

    #[tokio::test]
    async fn test_checkout_permalink() {
        let lines = vec![
            CheckoutLine {
                variant_id: "gid://shopify/ProductVariant/111".to_string(),
                quantity: 2,
            },
            CheckoutLine { variant_id: "222".to_string(), quantity: 1 },
        ];
        let url = client().create_checkout(&lines, None).await.unwrap();
        assert_eq!(url, "https://checkout.example.com/cart/111:2,222:1");
    }

    #[tokio::test]
    async fn test_checkout_permalink_encodes_discount() {
        let lines = vec![CheckoutLine { variant_id: "111".to_string(), quantity: 3 }];
        let url = client()
            .create_checkout(&lines, Some("BUY3SAVE10"))
            .await
            .unwrap();
        assert_eq!(url, "https://checkout.example.com/cart/111:3?discount=BUY3SAVE10");

        let url = client().create_checkout(&lines, Some("10% OFF")).await.unwrap();
        assert!(url.ends_with("?discount=10%25+OFF"));
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart() {
        let err = client().create_checkout(&[], None).await.unwrap_err();
        assert!(matches!(err, StorefrontError::CheckoutFailed(_)));
    }

    #[test]
    fn test_parse_products_page() {
        let data = serde_json::json!({
            "products": {
                "pageInfo": { "hasNextPage": true, "endCursor": "abc" },
                "edges": [{
                    "node": {
                        "id": "gid://shopify/Product/1",
                        "title": "Monstera Plant Food",
                        "handle": "monstera-plant-food",
                        "featuredImage": { "url": "https://cdn/img.jpg", "altText": null },
                        "variants": {
                            "edges": [{
                                "node": {
                                    "id": "gid://shopify/ProductVariant/11",
                                    "title": "8 oz",
                                    "price": { "amount": "13.99", "currencyCode": "USD" },
                                    "compareAtPrice": null,
                                    "selectedOptions": [{ "name": "Size", "value": "8 oz" }],
                                    "quantityAvailable": 7
                                }
                            }]
                        }
                    }
                }]
            }
        });

        let page = ShopifyClient::parse_page(data).unwrap();
        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("abc"));
        assert_eq!(page.products.len(), 1);

        let product = &page.products[0];
        assert_eq!(product.category, Category::Houseplants);
        // Null altText falls back to the product title.
        assert_eq!(product.featured_image.alt_text, "Monstera Plant Food");
        assert_eq!(product.variants[0].quantity_available, 7);
        assert_eq!(product.variants[0].price.amount, rust_decimal::Decimal::new(1399, 2));
    }

    #[test]
    fn test_parse_page_without_page_info() {
        let data = serde_json::json!({
            "products": { "edges": [] }
        });
        let page = ShopifyClient::parse_page(data).unwrap();
        assert!(!page.has_next_page);
        assert!(page.products.is_empty());
    }
}
