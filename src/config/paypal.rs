//! PayPal gateway configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration;

const SANDBOX_API_URL: &str = "https://api-m.sandbox.paypal.com";
const LIVE_API_URL: &str = "https://api-m.paypal.com";

/// PayPal environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

impl PayPalMode {
    /// REST API base URL for this environment.
    pub fn base_url(self) -> &'static str {
        match self {
            PayPalMode::Sandbox => SANDBOX_API_URL,
            PayPalMode::Live => LIVE_API_URL,
        }
    }
}

impl std::fmt::Display for PayPalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayPalMode::Sandbox => write!(f, "sandbox"),
            PayPalMode::Live => write!(f, "live"),
        }
    }
}

impl std::str::FromStr for PayPalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" => Ok(PayPalMode::Sandbox),
            "live" => Ok(PayPalMode::Live),
            other => Err(format!("unknown paypal mode: {}", other)),
        }
    }
}

/// PayPal REST credentials and checkout redirect targets.
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalConfig {
    /// Sandbox or live environment (PAYPAL_MODE overrides).
    #[serde(default)]
    pub mode: PayPalMode,
    /// REST client id (loaded from PAYPAL_CLIENT_ID env var).
    #[serde(skip)]
    pub client_id: String,
    /// REST client secret (loaded from PAYPAL_CLIENT_SECRET env var).
    #[serde(skip)]
    pub client_secret: String,
    /// Where PayPal sends the buyer after approval.
    pub return_url: String,
    /// Where PayPal sends the buyer after cancelling.
    pub cancel_url: String,
    /// HTTP timeout for gateway calls (default: 30s).
    #[serde(default, with = "duration")]
    pub timeout: Duration,
    /// Transaction description shown to the buyer.
    pub description: Option<String>,
    /// Overrides the API base URL (used against local stubs).
    pub base_url: Option<String>,
}

impl PayPalConfig {
    /// API base URL, honouring an explicit override.
    pub fn api_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(self.mode.base_url())
    }
}
