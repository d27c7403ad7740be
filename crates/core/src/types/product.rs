//! Catalog records as consumed by the cart.
//!
//! The back office writes these documents; the cart only reads them. Prices
//! are coerced on the way in so nothing downstream has to care whether the
//! document held `"1299"` or `1299`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};
use super::price::{deserialize_lenient, deserialize_lenient_opt};

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Regular price.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub price: Decimal,
    /// Discounted price, when the product is on sale.
    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    pub sale_price: Option<Decimal>,
    /// Units available for sale.
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// The price a customer pays when no variant is selected.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.price)
    }

    /// Image shown next to the product in the cart.
    ///
    /// Prefers the thumbnail, then the first gallery image.
    #[must_use]
    pub fn display_image(&self) -> &str {
        self.thumbnail
            .as_deref()
            .or_else(|| self.images.first().map(String::as_str))
            .unwrap_or("")
    }

    /// Find a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }
}

/// An alternate SKU of a product (e.g. 16GB vs 32GB) with its own price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub price: Decimal,
}
