//! Checkout.

use tracing::info;

use cedar_tech_core::{CustomerInfo, PaymentMethod, format_price};

use super::{CommandError, Session};
use crate::config::CliConfig;

/// Submit the stored cart as an order and empty it.
///
/// # Errors
///
/// Returns an error if the payment method is unknown, the cart is empty, or
/// the order cannot be written. The cart is kept in every failure case.
pub async fn place_order(
    config: &CliConfig,
    customer: CustomerInfo,
    payment: &str,
) -> Result<(), CommandError> {
    let payment_method: PaymentMethod = payment
        .parse()
        .map_err(|_| CommandError::InvalidPaymentMethod(payment.to_string()))?;

    let mut session = Session::open(config)?;
    let confirmation = session
        .engine
        .create_order(customer, payment_method)
        .await?;

    info!("Order placed: {}", confirmation.order_number);
    info!("Order ID: {}", confirmation.order_id);
    info!("Total: {}", format_price(confirmation.total));
    info!(
        "Estimated delivery: {}",
        confirmation.estimated_delivery_date.format("%Y-%m-%d")
    );
    info!("Payment: {payment_method}");
    Ok(())
}
