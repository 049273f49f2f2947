//! Configuration loading and validation for the checkout service.
//!
//! Uses serde_yaml to load YAML configuration files with support for
//! environment variable overrides for sensitive credentials.

mod app;
mod checkout;
mod duration;
mod error;
mod notification;
mod paypal;
mod server;
mod storage;

pub use app::AppConfig;
pub use checkout::{CheckoutConfig, MismatchPolicy};
pub use error::ConfigError;
pub use notification::{NotificationConfig, TelegramConfig};
pub use paypal::{PayPalConfig, PayPalMode};
pub use server::ServerConfig;
pub use storage::StorageConfig;

use serde::Deserialize;
use std::{env, fs};

/// Root configuration structure for the checkout service.
///
/// Required sections: app, paypal.
/// Optional sections: server, checkout, storage, notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application-level settings like name and environment.
    pub app: AppConfig,
    /// HTTP listener (optional, defaults to 127.0.0.1:3000).
    #[serde(default)]
    pub server: ServerConfig,
    /// Payment gateway credentials and redirect targets.
    pub paypal: PayPalConfig,
    /// Shipping rule and total verification (optional).
    #[serde(default)]
    pub checkout: CheckoutConfig,
    /// Order persistence (optional, in-memory when absent).
    pub storage: Option<StorageConfig>,
    /// Operator alert channels like Telegram (optional).
    pub notification: Option<NotificationConfig>,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// First loads environment variables from `.env` file (if exists),
    /// then loads YAML config and credentials from environment variables:
    /// - `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET`, `PAYPAL_MODE`
    /// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        config.load_credentials_from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Load credentials from environment variables.
    fn load_credentials_from_env(&mut self) -> Result<(), ConfigError> {
        self.paypal.client_id = env::var("PAYPAL_CLIENT_ID").unwrap_or_default();
        self.paypal.client_secret = env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default();

        if let Ok(mode) = env::var("PAYPAL_MODE") {
            self.paypal.mode = mode.parse().map_err(|reason| ConfigError::Env {
                name: "PAYPAL_MODE".to_string(),
                reason,
            })?;
        }

        if let Some(ref mut notification) = self.notification {
            if let Some(ref mut telegram) = notification.telegram {
                if telegram.enabled {
                    telegram.bot_token = env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
                    telegram.chat_id = env::var("TELEGRAM_CHAT_ID").unwrap_or_default();
                }
            }
        }

        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be positive".into()));
        }

        if self.paypal.return_url.is_empty() || self.paypal.cancel_url.is_empty() {
            return Err(ConfigError::Validation(
                "paypal.return_url and paypal.cancel_url are required".into(),
            ));
        }

        // Only require credentials outside development
        if !self.app.is_development()
            && (self.paypal.client_id.is_empty() || self.paypal.client_secret.is_empty())
        {
            return Err(ConfigError::Validation(
                "paypal: API credentials not found (set PAYPAL_CLIENT_ID and PAYPAL_CLIENT_SECRET env vars)"
                    .into(),
            ));
        }

        self.checkout
            .free_shipping_threshold()
            .map_err(ConfigError::Validation)?;
        self.checkout.flat_shipping().map_err(ConfigError::Validation)?;

        if let Some(ref storage) = self.storage {
            if storage.enabled && storage.path.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::Validation(
                    "storage.path is required when storage is enabled".into(),
                ));
            }
            if storage.max_connections == Some(0) {
                return Err(ConfigError::Validation(
                    "storage.max_connections must be positive".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
