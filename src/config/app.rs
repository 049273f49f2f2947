//! Application-level configuration.

use serde::Deserialize;

/// Application-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application name used in logs and alerts.
    pub name: String,
    /// Environment: "development", "staging", or "production".
    pub env: String,
    /// Logging verbosity: "debug", "info", "warn", "error".
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Returns true when running outside production and staging.
    pub fn is_development(&self) -> bool {
        self.env == "development"
    }
}
