//! Cedar Tech Cart - Cart pricing, persistence and order submission.
//!
//! # Architecture
//!
//! [`CartEngine`] owns a single [`Cart`] and is the only thing that mutates
//! it. After every change the cart is written to a local [`KeyValueStore`];
//! on startup [`CartEngine::load`] restores it unless it is older than the
//! cart TTL (30 minutes by default). Checkout turns the cart into an
//! [`OrderSnapshot`] and inserts it into an [`OrderStore`].
//!
//! ```rust,ignore
//! let mut engine = CartEngine::new(local, orders, catalog, Arc::new(SystemClock));
//! engine.load();
//!
//! match engine.add_item(&product, 1, None) {
//!     CartChange::Declined(shortage) => show_toast(&shortage.to_string()),
//!     _ => {}
//! }
//!
//! let confirmation = engine.create_order(customer, PaymentMethod::Whish).await?;
//! ```
//!
//! # Modules
//!
//! - [`cart`] - Cart and line item types
//! - [`engine`] - The cart engine
//! - [`shipping`] - Regional flat-rate shipping table
//! - [`order`] - Order snapshots and order numbers
//! - [`store`] - Storage ports and adapters
//! - [`clock`] - Time sources

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod clock;
pub mod engine;
pub mod error;
pub mod order;
pub mod shipping;
pub mod store;

pub use cart::{Cart, LineItem};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    CART_STORAGE_KEY, CartChange, CartEngine, DEFAULT_CART_TTL_MINUTES, LoadOutcome, LoadingFlag,
};
pub use error::{CartError, Result, StockShortage, StoreError, TotalsOverflow};
pub use order::{OrderConfirmation, OrderNumber, OrderSnapshot};
pub use shipping::compute_shipping;
pub use store::{KeyValueStore, OrderStore, ProductCatalog};
