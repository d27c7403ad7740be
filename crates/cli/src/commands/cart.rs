//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! ct-cli cart show
//! ct-cli cart add laptop-x1 --quantity 2 --variant 32gb
//! ct-cli cart update laptop-x1 3 --variant 32gb
//! ct-cli cart remove laptop-x1 --variant 32gb
//! ct-cli cart quote Tripoli
//! ct-cli cart clear
//! ```

use tracing::{info, warn};

use cedar_tech_cart::{Cart, CartChange};
use cedar_tech_core::{ProductId, VariantId, format_price};

use super::{CommandError, Session};
use crate::config::CliConfig;

/// Print the cart.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn show(config: &CliConfig) -> Result<(), CommandError> {
    let session = Session::open(config)?;
    print_cart(session.engine.cart());
    Ok(())
}

/// Add units of a product to the cart.
///
/// # Errors
///
/// Returns an error if the product or variant is unknown, or if stock is
/// insufficient.
pub fn add(
    config: &CliConfig,
    product_id: &str,
    quantity: i64,
    variant_id: Option<&str>,
) -> Result<(), CommandError> {
    let mut session = Session::open(config)?;
    let product = session.product(product_id)?;
    let variant = match variant_id {
        Some(id) => Some(product.variant(&VariantId::new(id)).cloned().ok_or_else(|| {
            CommandError::UnknownVariant {
                product: product_id.to_string(),
                variant: id.to_string(),
            }
        })?),
        None => None,
    };

    let change = session.engine.add_item(&product, quantity, variant.as_ref());
    report(change, &format!("Added {quantity} x {}", product.title))?;
    print_cart(session.engine.cart());
    Ok(())
}

/// Set the quantity of a line. Zero or less removes it.
///
/// # Errors
///
/// Returns an error if stock is insufficient.
pub fn update(
    config: &CliConfig,
    product_id: &str,
    quantity: i64,
    variant_id: Option<&str>,
) -> Result<(), CommandError> {
    let mut session = Session::open(config)?;
    let variant_id = variant_id.map(VariantId::new);

    let change = session.engine.update_quantity(
        &ProductId::new(product_id),
        quantity,
        variant_id.as_ref(),
    );
    report(change, &format!("Updated {product_id} to {quantity}"))?;
    print_cart(session.engine.cart());
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn remove(
    config: &CliConfig,
    product_id: &str,
    variant_id: Option<&str>,
) -> Result<(), CommandError> {
    let mut session = Session::open(config)?;
    let variant_id = variant_id.map(VariantId::new);

    let change = session
        .engine
        .remove_item(&ProductId::new(product_id), variant_id.as_ref());
    report(change, &format!("Removed {product_id}"))?;
    print_cart(session.engine.cart());
    Ok(())
}

/// Quote shipping for the current cart and keep it on the cart until the
/// next item change.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn quote(config: &CliConfig, city: &str) -> Result<(), CommandError> {
    let mut session = Session::open(config)?;
    let fee = session.engine.recalculate_shipping(city);
    info!("Shipping to {city}: {}", format_price(fee));
    print_cart(session.engine.cart());
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn clear(config: &CliConfig) -> Result<(), CommandError> {
    let mut session = Session::open(config)?;
    report(session.engine.clear(), "Cart cleared")?;
    Ok(())
}

fn report(change: CartChange, message: &str) -> Result<(), CommandError> {
    if change.into_result()? {
        info!("{message}");
    } else {
        warn!("Nothing to change");
    }
    Ok(())
}

pub(crate) fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in cart.items() {
        let variant = item
            .variant_name
            .as_deref()
            .map(|name| format!(" ({name})"))
            .unwrap_or_default();
        info!(
            "{} x {}{}  @ {}  = {}",
            item.quantity,
            item.product_title,
            variant,
            item.unit_price_display,
            item.total_display()
        );
    }
    info!("Items:    {}", cart.item_count());
    info!("Subtotal: {}", format_price(cart.subtotal()));
    info!("Shipping: {}", format_price(cart.shipping_fee()));
    info!("Total:    {}", format_price(cart.total()));
}
