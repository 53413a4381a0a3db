//! Persistence Adapter
//!
//! Mirrors cart and discount state into durable client storage under
//! versioned keys, and rehydrates them at startup. Storage is best-effort:
//! corruption is discarded with a warning, write failures are swallowed, and
//! in-memory state stays authoritative throughout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::aggregates::cart::LineItem;
use crate::domain::aggregates::discount::DiscountState;
use crate::{Result, StorefrontError};

/// Versioned key for the persisted cart (JSON array of line items).
pub const CART_KEY: &str = "tps_cart_v1";

/// Versioned key for the persisted discount (`{code, valid, amount}`).
pub const DISCOUNT_KEY: &str = "tps_discount_v1";

/// Durable key-value byte storage surviving reloads. May be unavailable
/// (private browsing, quota); every operation is fallible.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory [`StateStore`]. Clones share the same backing map, which lets a
/// rebuilt session rehydrate from what an earlier one wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.inner
            .lock()
            .map_err(|_| StorefrontError::Storage("store lock poisoned".to_string()))
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Reads and mirrors cart/discount records over a [`StateStore`].
pub struct PersistenceAdapter {
    store: Box<dyn StateStore>,
}

impl PersistenceAdapter {
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Loads the persisted cart. Malformed JSON and non-array payloads are
    /// corruption: logged and replaced with an empty cart, never surfaced.
    pub fn load_cart(&self) -> Vec<LineItem> {
        let bytes = match self.store.get(CART_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return vec![],
            Err(e) => {
                tracing::warn!(error = %e, key = CART_KEY, "cart storage unavailable, starting empty");
                return vec![];
            }
        };
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) if value.is_array() => match serde_json::from_value(value) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = %e, key = CART_KEY, "discarding corrupt cart record");
                    vec![]
                }
            },
            Ok(_) => {
                tracing::warn!(key = CART_KEY, "persisted cart is not an array, discarding");
                vec![]
            }
            Err(e) => {
                tracing::warn!(error = %e, key = CART_KEY, "discarding unparseable cart record");
                vec![]
            }
        }
    }

    /// Loads the persisted discount, falling back to no-discount on any
    /// corruption or storage failure.
    pub fn load_discount(&self) -> DiscountState {
        let bytes = match self.store.get(DISCOUNT_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return DiscountState::default(),
            Err(e) => {
                tracing::warn!(error = %e, key = DISCOUNT_KEY, "discount storage unavailable");
                return DiscountState::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, key = DISCOUNT_KEY, "discarding corrupt discount record");
            DiscountState::default()
        })
    }

    /// Best-effort cart write; failures are logged and swallowed.
    pub fn save_cart(&mut self, items: &[LineItem]) {
        match serde_json::to_vec(items) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(CART_KEY, &bytes) {
                    tracing::warn!(error = %e, key = CART_KEY, "failed to persist cart");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize cart"),
        }
    }

    /// Best-effort discount write; failures are logged and swallowed.
    pub fn save_discount(&mut self, discount: &DiscountState) {
        match serde_json::to_vec(discount) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(DISCOUNT_KEY, &bytes) {
                    tracing::warn!(error = %e, key = DISCOUNT_KEY, "failed to persist discount");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize discount"),
        }
    }
}
