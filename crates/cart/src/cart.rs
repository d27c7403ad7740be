//! Cart and line item types.
//!
//! A [`Cart`] only exposes read access to the outside world. Every mutation
//! goes through [`crate::CartEngine`], which recalculates totals and persists
//! the result, so `subtotal` and each line's `total_price` can never go stale.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cedar_tech_core::{Product, ProductId, Variant, VariantId, format_price};

use crate::error::TotalsOverflow;

/// One product (optionally one variant of it) in the cart.
///
/// Identified by `(product_id, variant_id)`: the same laptop in 16GB and 32GB
/// occupies two lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    pub product_slug: String,
    pub product_title: String,
    #[serde(default)]
    pub product_image: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Formatted `unit_price`. Older stored carts may lack it.
    #[serde(default)]
    pub unit_price_display: String,
    /// `unit_price * quantity`.
    #[serde(default)]
    pub total_price: Decimal,
}

impl LineItem {
    /// Build a line for `product`, priced from `variant` when one is selected.
    ///
    /// # Errors
    ///
    /// Returns `TotalsOverflow` if `unit_price * quantity` does not fit in a
    /// `Decimal`.
    pub fn new(
        product: &Product,
        variant: Option<&Variant>,
        quantity: u32,
    ) -> Result<Self, TotalsOverflow> {
        let unit_price = variant.map_or_else(|| product.effective_price(), |v| v.price);
        let mut item = Self {
            product_id: product.id.clone(),
            variant_id: variant.map(|v| v.id.clone()),
            variant_name: variant.map(|v| v.name.clone()),
            product_slug: product.slug.clone(),
            product_title: product.title.clone(),
            product_image: product.display_image().to_string(),
            quantity,
            unit_price,
            unit_price_display: format_price(unit_price),
            total_price: Decimal::ZERO,
        };
        item.update_total()?;
        Ok(item)
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        &self.product_id == product_id && self.variant_id.as_ref() == variant_id
    }

    /// Formatted `total_price`.
    #[must_use]
    pub fn total_display(&self) -> String {
        format_price(self.total_price)
    }

    /// Totals are refreshed by the next `Cart::recalculate`.
    pub(crate) const fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    fn update_total(&mut self) -> Result<(), TotalsOverflow> {
        self.total_price = self
            .unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or(TotalsOverflow)?;
        Ok(())
    }

    fn backfill_display(&mut self) {
        if self.unit_price_display.is_empty() {
            self.unit_price_display = format_price(self.unit_price);
        }
    }
}

/// The shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
    #[serde(default)]
    subtotal: Decimal,
    #[serde(default)]
    shipping_fee: Decimal,
    #[serde(default)]
    total: Decimal,
    last_touched_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart stamped with `now`.
    #[must_use]
    pub const fn empty(now: DateTime<Utc>) -> Self {
        Self {
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            last_touched_at: now,
        }
    }

    /// Line items in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub const fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    #[must_use]
    pub const fn shipping_fee(&self) -> Decimal {
        self.shipping_fee
    }

    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// When the cart was last mutated.
    #[must_use]
    pub const fn last_touched_at(&self) -> DateTime<Utc> {
        self.last_touched_at
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Find the line with the given identity.
    #[must_use]
    pub fn line(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> Option<&LineItem> {
        self.items.iter().find(|i| i.matches(product_id, variant_id))
    }

    /// Whether the cart is at least `ttl` old at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.last_touched_at >= ttl
    }

    pub(crate) fn line_mut(
        &mut self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Option<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|i| i.matches(product_id, variant_id))
    }

    pub(crate) fn push(&mut self, item: LineItem) {
        self.items.push(item);
    }

    /// Remove the matching line. Returns whether anything was removed.
    pub(crate) fn remove(&mut self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| !i.matches(product_id, variant_id));
        self.items.len() < len_before
    }

    /// Recompute totals after the items changed.
    ///
    /// Any shipping quote was based on the old subtotal, so it drops back to 0.
    /// On overflow the cart is left half-updated; callers work on a copy.
    pub(crate) fn recalculate(&mut self) -> Result<(), TotalsOverflow> {
        self.shipping_fee = Decimal::ZERO;
        self.refresh_totals()
    }

    /// Fold a shipping quote into the total. Unchanged on overflow.
    pub(crate) fn set_shipping_fee(&mut self, fee: Decimal) -> Result<(), TotalsOverflow> {
        self.total = self.subtotal.checked_add(fee).ok_or(TotalsOverflow)?;
        self.shipping_fee = fee;
        Ok(())
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_touched_at = now;
    }

    /// Repair a cart read back from storage.
    ///
    /// Stored totals are never trusted: line totals, subtotal and total are
    /// recomputed and missing display prices are filled in. A cart whose
    /// amounts cannot be totalled is unusable and should be discarded.
    pub(crate) fn normalize(&mut self) -> Result<(), TotalsOverflow> {
        self.items.retain(|i| i.quantity > 0);
        for item in &mut self.items {
            item.backfill_display();
        }
        self.refresh_totals()
    }

    fn refresh_totals(&mut self) -> Result<(), TotalsOverflow> {
        let mut subtotal = Decimal::ZERO;
        for item in &mut self.items {
            item.update_total()?;
            subtotal = subtotal
                .checked_add(item.total_price)
                .ok_or(TotalsOverflow)?;
        }
        self.total = subtotal
            .checked_add(self.shipping_fee)
            .ok_or(TotalsOverflow)?;
        self.subtotal = subtotal;
        Ok(())
    }
}
