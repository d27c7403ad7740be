//! Cedar Tech Core - Shared types library.
//!
//! This crate provides common types used across all Cedar Tech components:
//! - `cart` - Cart pricing, persistence and order submission
//! - `cli` - Command-line driver for the cart
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, lenient prices, catalog records, customer details and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
