//! Customer details captured at checkout.

use serde::{Deserialize, Serialize};

/// Contact and delivery details entered on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Destination city, used to pick the shipping rate.
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
