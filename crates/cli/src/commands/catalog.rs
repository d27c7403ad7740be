//! Catalog listing.

use tracing::info;

use cedar_tech_core::format_price;

use super::{CommandError, Session};
use crate::config::CliConfig;

/// List every product with its effective price, stock and variants.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn list(config: &CliConfig) -> Result<(), CommandError> {
    let session = Session::open(config)?;
    let products = session.catalog.all();

    if products.is_empty() {
        info!("Catalog is empty ({})", config.catalog_path.display());
        return Ok(());
    }

    for product in products {
        let price = match product.sale_price {
            Some(sale) => format!("{} (was {})", format_price(sale), format_price(product.price)),
            None => format_price(product.price),
        };
        info!("{}  {}  {}  stock {}", product.id, product.title, price, product.stock);
        for variant in &product.variants {
            info!("    {}  {}  {}", variant.id, variant.name, format_price(variant.price));
        }
    }
    Ok(())
}
