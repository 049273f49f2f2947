//! Notification configuration.

use serde::Deserialize;

/// Notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Telegram bot notifications.
    pub telegram: Option<TelegramConfig>,
}

/// Telegram notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Whether Telegram notifications are active.
    #[serde(default)]
    pub enabled: bool,
    /// Bot token (loaded from TELEGRAM_BOT_TOKEN env var).
    #[serde(skip)]
    pub bot_token: String,
    /// Target chat/channel ID (loaded from TELEGRAM_CHAT_ID env var).
    #[serde(skip)]
    pub chat_id: String,
    /// Alert when a payment moved but the order could not be recorded.
    #[serde(default = "enabled_by_default")]
    pub notify_reconciliation: bool,
    /// Announce service startup and shutdown.
    #[serde(default)]
    pub notify_lifecycle: bool,
}

fn enabled_by_default() -> bool {
    true
}
