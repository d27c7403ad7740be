//! Cart error types.

use thiserror::Error;

use cedar_tech_core::ProductId;

/// A declined quantity change: the shopper asked for more than is in stock.
///
/// The `Display` output is the message shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Only {available} available")]
pub struct StockShortage {
    pub product_id: ProductId,
    pub product_title: String,
    /// Quantity the line would have had after the change.
    pub requested: u64,
    /// Units in stock.
    pub available: u32,
}

/// A line total, subtotal or order total does not fit in a `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Amount too large to total")]
pub struct TotalsOverflow;

/// Errors raised by the cart and order flow.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity exceeds available stock.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(StockShortage),

    /// An order was attempted with no items.
    #[error("Cannot place an order with an empty cart")]
    EmptyCart,

    /// Prices and quantities multiply out beyond the representable range.
    #[error("Cannot total the cart: {0}")]
    TotalsOverflow(#[from] TotalsOverflow),

    /// The order store rejected or failed the write. The cart is kept for a retry.
    #[error("Failed to save order: {0}")]
    OrderPersistence(#[source] StoreError),
}

impl From<StockShortage> for CartError {
    fn from(shortage: StockShortage) -> Self {
        Self::InsufficientStock(shortage)
    }
}

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data exists but cannot be parsed.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    /// Key contains characters the backend cannot store.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The backend is unreachable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
