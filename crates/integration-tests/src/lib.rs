//! Integration tests for Cedar Tech.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cedar-tech-integration-tests
//! ```
//!
//! Tests drive [`CartEngine`] over the file-backed adapters in a temporary
//! directory, with a [`ManualClock`] so cart expiry can be tested without
//! waiting.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use cedar_tech_cart::store::{FileKeyValueStore, JsonLinesOrderStore, MemoryCatalog};
use cedar_tech_cart::{CART_STORAGE_KEY, CartEngine, ManualClock};
use cedar_tech_core::{CustomerInfo, Product, ProductId, Variant, VariantId};

/// A scratch data directory shared by every engine a test opens.
///
/// Opening a second engine on the same context is the equivalent of the
/// shopper closing the browser and coming back.
pub struct TestContext {
    dir: TempDir,
    pub catalog: MemoryCatalog,
    pub clock: ManualClock,
}

impl TestContext {
    /// Create an empty data directory with the standard test catalog.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        Self {
            dir,
            catalog: MemoryCatalog::with_products(sample_products()),
            clock: ManualClock::new(start_time()),
        }
    }

    /// Open an engine on this context's data directory and load it.
    #[must_use]
    pub fn open_engine(&self) -> CartEngine {
        let mut engine = CartEngine::new(
            Box::new(FileKeyValueStore::new(self.local_dir())),
            Box::new(JsonLinesOrderStore::new(self.orders_path())),
            Arc::new(self.catalog.clone()),
            Arc::new(self.clock.clone()),
        );
        let _ = engine.load();
        engine
    }

    /// Directory of the local key-value store.
    #[must_use]
    pub fn local_dir(&self) -> PathBuf {
        self.dir.path().join("local")
    }

    /// File holding the stored cart.
    #[must_use]
    pub fn cart_file(&self) -> PathBuf {
        self.local_dir().join(format!("{CART_STORAGE_KEY}.json"))
    }

    #[must_use]
    pub fn orders_path(&self) -> PathBuf {
        self.dir.path().join("orders.jsonl")
    }

    /// Move the shared clock forward.
    pub fn advance(&self, by: TimeDelta) {
        self.clock.advance(by);
    }

    /// Look up a product from the test catalog.
    ///
    /// # Panics
    ///
    /// Panics if the product is not in the catalog.
    #[must_use]
    pub fn product(&self, id: &str) -> Product {
        use cedar_tech_cart::ProductCatalog;

        self.catalog
            .product(&ProductId::new(id))
            .expect("product missing from test catalog")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 2026-03-01 09:00 UTC.
#[must_use]
pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// Catalog used across integration tests.
///
/// - `ssd-1tb` - $79.00, stock 4
/// - `monitor-27` - $249.00 on sale for $219.00, stock 1
/// - `laptop-x1` - $899.00, stock 2, variants `16gb` ($899) and `32gb` ($1,049)
#[must_use]
pub fn sample_products() -> Vec<Product> {
    vec![
        Product {
            id: ProductId::new("ssd-1tb"),
            slug: "ssd-1tb".to_string(),
            title: "SSD 1TB".to_string(),
            images: vec!["ssd.jpg".to_string()],
            thumbnail: None,
            price: Decimal::from(79),
            sale_price: None,
            stock: 4,
            variants: Vec::new(),
        },
        Product {
            id: ProductId::new("monitor-27"),
            slug: "monitor-27".to_string(),
            title: "Monitor 27\"".to_string(),
            images: Vec::new(),
            thumbnail: Some("monitor-thumb.jpg".to_string()),
            price: Decimal::from(249),
            sale_price: Some(Decimal::from(219)),
            stock: 1,
            variants: Vec::new(),
        },
        Product {
            id: ProductId::new("laptop-x1"),
            slug: "laptop-x1".to_string(),
            title: "Laptop X1".to_string(),
            images: vec!["x1-front.jpg".to_string(), "x1-side.jpg".to_string()],
            thumbnail: None,
            price: Decimal::from(899),
            sale_price: None,
            stock: 2,
            variants: vec![
                Variant {
                    id: VariantId::new("16gb"),
                    name: "16GB".to_string(),
                    price: Decimal::from(899),
                },
                Variant {
                    id: VariantId::new("32gb"),
                    name: "32GB".to_string(),
                    price: Decimal::from(1049),
                },
            ],
        },
    ]
}

/// A checkout form filled in for `city`.
#[must_use]
pub fn customer_in(city: &str) -> CustomerInfo {
    CustomerInfo {
        full_name: "Nour Saleh".to_string(),
        email: "nour@example.com".to_string(),
        phone: "+961 70 123 456".to_string(),
        address: "Rue Gouraud".to_string(),
        city: city.to_string(),
        notes: Some("Ring twice".to_string()),
    }
}
