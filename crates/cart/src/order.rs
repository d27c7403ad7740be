//! Order snapshots submitted to the order store.

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cedar_tech_core::{CustomerInfo, OrderId, OrderStatus, PaymentMethod, PaymentStatus, define_id};

use crate::cart::{Cart, LineItem};
use crate::error::TotalsOverflow;
use crate::shipping::compute_shipping;

define_id!(OrderNumber);

/// Length of the random part of an order number.
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

impl OrderNumber {
    /// Generate a human-readable order number, e.g. `ORD-1760745600123-K3Q9ZA`.
    ///
    /// Uniqueness is best effort: millisecond timestamp plus a random suffix.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(ORDER_NUMBER_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        Self::new(format!("ORD-{}-{suffix}", now.timestamp_millis()))
    }
}

/// Frozen copy of a cart plus customer and payment details.
///
/// Built once at checkout and handed to the order store by value; the cart
/// keeps no reference to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_number: OrderNumber,
    pub customer: CustomerInfo,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub estimated_delivery_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OrderSnapshot {
    /// Snapshot `cart` for submission.
    ///
    /// Shipping is always recomputed from the customer's city; whatever fee
    /// the cart carried while browsing is ignored.
    ///
    /// # Errors
    ///
    /// Returns `TotalsOverflow` if subtotal plus shipping does not fit in a
    /// `Decimal`.
    pub fn new(
        cart: &Cart,
        customer: CustomerInfo,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Self, TotalsOverflow> {
        let subtotal = cart.subtotal();
        let shipping_fee = compute_shipping(subtotal, &customer.city);
        let total = subtotal.checked_add(shipping_fee).ok_or(TotalsOverflow)?;
        Ok(Self {
            order_number: OrderNumber::generate(now),
            customer,
            items: cart.items().to_vec(),
            subtotal,
            shipping_fee,
            total,
            payment_method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            estimated_delivery_date: now + TimeDelta::days(payment_method.delivery_days()),
            created_at: now,
        })
    }
}

/// What the shopper sees after a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    /// Document ID assigned by the order store.
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total: Decimal,
    pub estimated_delivery_date: DateTime<Utc>,
}
