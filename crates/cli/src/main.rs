//! Cedar Tech CLI - Drive the cart engine from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog
//! ct-cli catalog
//!
//! # Build a cart
//! ct-cli cart add laptop-x1 --quantity 1 --variant 32gb
//! ct-cli cart show
//!
//! # Quote shipping for any subtotal
//! ct-cli shipping 75 Tripoli
//!
//! # Place the order
//! ct-cli checkout --name "Rami Haddad" --email rami@example.com \
//!     --phone "+961 3 123 456" --address "Main street" --city Beirut \
//!     --payment cash_on_delivery
//! ```
//!
//! # Commands
//!
//! - `catalog` - List products
//! - `cart` - Show or change the cart
//! - `shipping` - Quote shipping for a subtotal and city
//! - `checkout` - Submit the cart as an order
//!
//! Paths and cart lifetime come from `CEDAR_*` environment variables, see
//! [`config`]. Set `CEDAR_LOG_FORMAT=json` for JSON log lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use cedar_tech_core::CustomerInfo;

mod commands;
mod config;

use commands::CommandError;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "ct-cli")]
#[command(author, version, about = "Cedar Tech cart CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products in the catalog
    Catalog,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Quote shipping for a subtotal and city
    Shipping {
        /// Order subtotal, e.g. 75 or 1,299.00
        subtotal: String,
        /// Destination city
        city: String,
    },
    /// Submit the cart as an order
    Checkout {
        /// Customer full name
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,

        /// Street address
        #[arg(long)]
        address: String,

        /// Destination city (sets the shipping rate)
        #[arg(long)]
        city: String,

        /// Payment method (`whish`, `cash_on_delivery`)
        #[arg(long, default_value = "cash_on_delivery")]
        payment: String,

        /// Delivery notes
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add a product
    Add {
        product: String,

        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,

        /// Variant ID
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Set a line's quantity (0 removes it)
    Update {
        product: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Remove a line
    Remove {
        product: String,

        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Quote shipping for the cart
    Quote {
        city: String,
    },
    /// Empty the cart
    Clear,
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    // Defaults to info level if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);
    if config::json_logs(|key| std::env::var(key).ok()) {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let config = CliConfig::from_env()?;

    match cli.command {
        Commands::Catalog => commands::catalog::list(&config)?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&config)?,
            CartAction::Add {
                product,
                quantity,
                variant,
            } => commands::cart::add(&config, &product, quantity, variant.as_deref())?,
            CartAction::Update {
                product,
                quantity,
                variant,
            } => commands::cart::update(&config, &product, quantity, variant.as_deref())?,
            CartAction::Remove { product, variant } => {
                commands::cart::remove(&config, &product, variant.as_deref())?;
            }
            CartAction::Quote { city } => commands::cart::quote(&config, &city)?,
            CartAction::Clear => commands::cart::clear(&config)?,
        },
        Commands::Shipping { subtotal, city } => commands::shipping::quote(&subtotal, &city)?,
        Commands::Checkout {
            name,
            email,
            phone,
            address,
            city,
            payment,
            notes,
        } => {
            let customer = CustomerInfo {
                full_name: name,
                email,
                phone,
                address,
                city,
                notes: notes.filter(|n| !n.trim().is_empty()),
            };
            commands::checkout::place_order(&config, customer, &payment).await?;
        }
    }
    Ok(())
}
