//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CEDAR_DATA_DIR` - Directory holding the local cart file (default: `.cedar`)
//! - `CEDAR_CATALOG_PATH` - Product catalog JSON (default: `<data dir>/catalog.json`)
//! - `CEDAR_ORDERS_PATH` - Order log (default: `<data dir>/orders.jsonl`)
//! - `CEDAR_CART_TTL_MINUTES` - Minutes a stored cart stays valid (default: 30)
//! - `CEDAR_LOG_FORMAT` - `json` for JSON log lines, anything else for text

use std::path::PathBuf;

use chrono::TimeDelta;
use thiserror::Error;

use cedar_tech_cart::DEFAULT_CART_TTL_MINUTES;

const DEFAULT_DATA_DIR: &str = ".cedar";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the CLI keeps its data and how long carts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Directory of the local key-value store
    pub data_dir: PathBuf,
    /// JSON array of products
    pub catalog_path: PathBuf,
    /// Newline-delimited order records
    pub orders_path: PathBuf,
    /// Stored carts older than this are discarded on load
    pub cart_ttl: TimeDelta,
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `CEDAR_CART_TTL_MINUTES` is not a positive
    /// whole number.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(get_or_default(&lookup, "CEDAR_DATA_DIR", DEFAULT_DATA_DIR));
        let catalog_path = lookup("CEDAR_CATALOG_PATH")
            .map_or_else(|| data_dir.join("catalog.json"), PathBuf::from);
        let orders_path = lookup("CEDAR_ORDERS_PATH")
            .map_or_else(|| data_dir.join("orders.jsonl"), PathBuf::from);
        let cart_ttl = parse_ttl_minutes(lookup("CEDAR_CART_TTL_MINUTES").as_deref())?;

        Ok(Self {
            data_dir,
            catalog_path,
            orders_path,
            cart_ttl,
        })
    }
}

/// Whether log lines should be written as JSON.
///
/// Read before the subscriber is installed, so `.env` must already be loaded.
pub fn json_logs(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup("CEDAR_LOG_FORMAT").is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable with a default value. Empty values count as unset.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_ttl_minutes(raw: Option<&str>) -> Result<TimeDelta, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(TimeDelta::minutes(DEFAULT_CART_TTL_MINUTES));
    };
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("CEDAR_CART_TTL_MINUTES".to_string(), reason)
    };
    let minutes = raw.parse::<i64>().map_err(|e| invalid(e.to_string()))?;
    if minutes <= 0 {
        return Err(invalid(format!("must be positive (got {minutes})")));
    }
    TimeDelta::try_minutes(minutes).ok_or_else(|| invalid(format!("{minutes} is out of range")))
}
