//! Storage ports used by the cart engine, with in-memory and file adapters.
//!
//! # Ports
//!
//! - [`KeyValueStore`] - Local durable storage on the shopper's device
//! - [`OrderStore`] - Remote document collection receiving submitted orders
//! - [`ProductCatalog`] - Read-only product lookup for prices and stock

pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use cedar_tech_core::{OrderId, Product, ProductId};

use crate::error::StoreError;
use crate::order::OrderSnapshot;

pub use file::{FileKeyValueStore, JsonLinesOrderStore, StoredOrder, load_catalog};
pub use memory::{MemoryCatalog, MemoryKeyValueStore, MemoryOrderStore};

/// String key-value storage that survives restarts.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, or `None` if the key was never written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Collection that accepts submitted orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order and return the identifier the store generated for it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    async fn insert(&self, order: OrderSnapshot) -> Result<OrderId, StoreError>;
}

/// Read-only view of the product catalog.
pub trait ProductCatalog: Send + Sync {
    /// Current record for a product, if it exists.
    fn product(&self, id: &ProductId) -> Option<Product>;
}

pub type KeyValueStoreBox = Box<dyn KeyValueStore>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type ProductCatalogRef = Arc<dyn ProductCatalog>;
