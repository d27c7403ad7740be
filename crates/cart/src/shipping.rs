//! Flat-rate shipping by destination region.
//!
//! Rates are a business rule agreed with the courier, not derived data. The
//! table is matched in declaration order, so keep it ordered.

use rust_decimal::Decimal;

/// Orders at or above this subtotal ship free anywhere.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::ONE_HUNDRED;

/// Rate charged when the city matches no known region.
pub const DEFAULT_SHIPPING_RATE: u32 = 10;

/// Region name fragments and their flat rates.
pub const SHIPPING_RATES: &[(&str, u32)] = &[
    ("beirut", 0),
    ("mount lebanon", 5),
    ("tripoli", 8),
    ("saida", 8),
    ("nabatieh", 10),
    ("baalbek", 12),
    ("akkar", 15),
    ("hermel", 15),
];

/// Shipping fee for an order of `subtotal` delivered to `city`.
///
/// Matching is a case-insensitive substring test, so `"Tripoli, North"` and
/// `"TRIPOLI"` both hit the Tripoli rate. The first matching region wins.
#[must_use]
pub fn compute_shipping(subtotal: Decimal, city: &str) -> Decimal {
    let city = city.to_lowercase();
    if subtotal >= FREE_SHIPPING_THRESHOLD || city.contains("beirut") {
        return Decimal::ZERO;
    }

    let rate = SHIPPING_RATES
        .iter()
        .find(|(region, _)| city.contains(region))
        .map_or(DEFAULT_SHIPPING_RATE, |(_, rate)| *rate);
    Decimal::from(rate)
}
