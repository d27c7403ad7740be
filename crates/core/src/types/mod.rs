//! Core types for the Cedar Tech storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod customer;
pub mod id;
pub mod price;
pub mod product;
pub mod status;

pub use customer::CustomerInfo;
pub use id::*;
pub use price::{PriceError, format_price, parse_price, parse_price_or_zero};
pub use product::{Product, Variant};
pub use status::*;
