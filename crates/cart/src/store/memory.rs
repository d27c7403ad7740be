use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::RwLock as AsyncRwLock;
use uuid::Uuid;

use cedar_tech_core::{OrderId, Product, ProductId};

use super::{KeyValueStore, OrderStore, ProductCatalog};
use crate::error::StoreError;
use crate::order::OrderSnapshot;

/// In-memory key-value store.
///
/// Clones share the same map, so a test can hand one clone to the engine and
/// inspect what it wrote through another.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// In-memory order collection.
///
/// Can be switched into a failing mode to exercise the checkout error path.
#[derive(Debug, Default, Clone)]
pub struct MemoryOrderStore {
    orders: Arc<AsyncRwLock<Vec<(OrderId, OrderSnapshot)>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryOrderStore {
    /// Creates a new, empty order store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following insert fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All orders inserted so far, oldest first.
    pub async fn orders(&self) -> Vec<(OrderId, OrderSnapshot)> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: OrderSnapshot) -> Result<OrderId, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order store offline".to_string()));
        }
        let id = OrderId::new(Uuid::new_v4().to_string());
        self.orders.write().await.push((id.clone(), order));
        Ok(id)
    }
}

/// In-memory product catalog.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl MemoryCatalog {
    /// Creates a new, empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding `products`.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.upsert(product);
        }
        catalog
    }

    /// Insert or replace a product.
    pub fn upsert(&self, product: Product) {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        products.insert(product.id.clone(), product);
    }

    /// All products, sorted by title.
    #[must_use]
    pub fn all(&self) -> Vec<Product> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by(|a, b| a.title.cmp(&b.title));
        all
    }
}

impl ProductCatalog for MemoryCatalog {
    fn product(&self, id: &ProductId) -> Option<Product> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        products.get(id).cloned()
    }
}
