//! Price parsing and display.
//!
//! Catalog records are maintained by hand in the back office, so a price may
//! arrive as a JSON number (`1299`), a string (`"1299.00"`), or a string with
//! thousands separators (`"1,299"`). Everything is coerced to [`Decimal`] once,
//! at the boundary, and an unparsable value becomes zero.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};

/// Errors that can occur when parsing a price.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// The input is a negative number.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// Parse a price from its textual form.
///
/// Surrounding whitespace and `,` thousands separators are ignored.
///
/// # Errors
///
/// Returns an error if the input is empty, not a number, or negative.
pub fn parse_price(raw: &str) -> Result<Decimal, PriceError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(PriceError::Empty);
    }

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| PriceError::Invalid(raw.to_string()))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(PriceError::Negative(value));
    }
    Ok(value)
}

/// Parse a price, falling back to zero on any error.
#[must_use]
pub fn parse_price_or_zero(raw: &str) -> Decimal {
    parse_price(raw).unwrap_or(Decimal::ZERO)
}

/// Format a price for display, e.g. `$1,299.00`.
///
/// Half-cents round away from zero.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = format!(
        "{:.2}",
        amount
            .abs()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    );
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{fraction}")
}

/// A price as it appears in a loosely-typed record.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(serde_json::Number),
    Text(String),
}

impl RawPrice {
    fn into_decimal(self) -> Decimal {
        match self {
            Self::Number(n) => parse_price_or_zero(&n.to_string()),
            Self::Text(s) => parse_price_or_zero(&s),
        }
    }
}

/// Serde helper for a required price field that may be a number or a string.
///
/// Anything unparsable (including `null`) deserializes to zero.
///
/// # Errors
///
/// Only fails if the underlying deserializer fails.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| serde_json::from_value::<RawPrice>(value).ok())
        .map_or(Decimal::ZERO, RawPrice::into_decimal))
}

/// Serde helper for an optional price field (e.g. a sale price).
///
/// A missing, `null` or empty value deserializes to `None`; any other
/// unparsable value deserializes to zero.
///
/// # Errors
///
/// Only fails if the underlying deserializer fails.
pub fn deserialize_lenient_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(
            serde_json::from_value::<RawPrice>(value).map_or(Decimal::ZERO, RawPrice::into_decimal),
        ),
    })
}
