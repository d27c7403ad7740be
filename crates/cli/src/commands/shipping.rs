//! Shipping quote.

use tracing::info;

use cedar_tech_cart::compute_shipping;
use cedar_tech_core::{format_price, parse_price};

use super::CommandError;

/// Quote shipping for an arbitrary subtotal and city.
///
/// Works without a catalog or a stored cart.
///
/// # Errors
///
/// Returns `CommandError::Price` if `subtotal` is not a valid amount.
pub fn quote(subtotal: &str, city: &str) -> Result<(), CommandError> {
    let subtotal = parse_price(subtotal)?;
    let fee = compute_shipping(subtotal, city);
    info!(
        "Shipping to {city} on {}: {}",
        format_price(subtotal),
        format_price(fee)
    );
    Ok(())
}
