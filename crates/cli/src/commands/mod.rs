//! Command implementations.
//!
//! Every command opens a [`Session`]: the catalog plus a loaded
//! [`CartEngine`] over the file-backed stores named by [`CliConfig`].

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod shipping;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use cedar_tech_cart::store::{FileKeyValueStore, JsonLinesOrderStore, MemoryCatalog, load_catalog};
use cedar_tech_cart::{CartEngine, CartError, LoadOutcome, StoreError, SystemClock};
use cedar_tech_core::{PriceError, Product, ProductId};

use crate::config::{CliConfig, ConfigError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Invalid amount: {0}")]
    Price(#[from] PriceError),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Product {product} has no variant {variant}")]
    UnknownVariant { product: String, variant: String },

    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),
}

/// Catalog and cart engine for one command invocation.
pub struct Session {
    pub catalog: MemoryCatalog,
    pub engine: CartEngine,
}

impl Session {
    /// Load the catalog and restore the stored cart.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Store` if the catalog file cannot be read.
    pub fn open(config: &CliConfig) -> Result<Self, CommandError> {
        let catalog = load_catalog(&config.catalog_path)?;

        let mut engine = CartEngine::new(
            Box::new(FileKeyValueStore::new(&config.data_dir)),
            Box::new(JsonLinesOrderStore::new(&config.orders_path)),
            Arc::new(catalog.clone()),
            Arc::new(SystemClock),
        )
        .with_cart_ttl(config.cart_ttl);

        let outcome = engine.load();
        if outcome == LoadOutcome::Corrupt {
            info!("Stored cart was unreadable, starting fresh");
        }
        debug!(?outcome, "cart loaded");

        Ok(Self { catalog, engine })
    }

    /// Look up a product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::UnknownProduct` if it is not listed.
    pub fn product(&self, id: &str) -> Result<Product, CommandError> {
        use cedar_tech_cart::ProductCatalog;

        self.catalog
            .product(&ProductId::new(id))
            .ok_or_else(|| CommandError::UnknownProduct(id.to_string()))
    }
}
