use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::config;
use crate::notification::{Event, EventType, NotificationError, Notifier, format_event};

const TELEGRAM_API_URL: &str = "https://api.telegram.org/bot";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_MESSAGE_LENGTH: usize = 4096;
const ASYNC_QUEUE_SIZE: usize = 100;

/// Telegram notifier configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from BotFather.
    pub bot_token: String,
    /// Chat that receives alerts.
    pub chat_id: String,
    pub notify_reconciliation: bool,
    pub notify_lifecycle: bool,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            notify_reconciliation: true,
            notify_lifecycle: true,
        }
    }

    /// Builds the notifier settings from the file configuration.
    pub fn from_config(cfg: &config::TelegramConfig) -> Self {
        Self {
            bot_token: cfg.bot_token.clone(),
            chat_id: cfg.chat_id.clone(),
            notify_reconciliation: cfg.notify_reconciliation,
            notify_lifecycle: cfg.notify_lifecycle,
        }
    }
}

/// Sends operator alerts through the Telegram Bot API.
///
/// `send_async` hands events to a background worker so request handlers never
/// wait on Telegram.
pub struct TelegramNotifier {
    config: TelegramConfig,
    http_client: reqwest::Client,
    api_url: String,
    sender: mpsc::Sender<Event>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotificationError> {
        if config.bot_token.is_empty() {
            return Err(NotificationError::new("bot_token is required"));
        }
        if config.chat_id.is_empty() {
            return Err(NotificationError::new("chat_id is required"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::new(format!("Failed to create HTTP client: {}", e)))?;

        let api_url = format!("{}{}", TELEGRAM_API_URL, config.bot_token);

        let (sender, receiver) = mpsc::channel(ASYNC_QUEUE_SIZE);

        Self::spawn_worker(
            receiver,
            config.chat_id.clone(),
            http_client.clone(),
            api_url.clone(),
        );

        Ok(Self {
            config,
            http_client,
            api_url,
            sender,
        })
    }

    fn spawn_worker(
        mut receiver: mpsc::Receiver<Event>,
        chat_id: String,
        http_client: reqwest::Client,
        api_url: String,
    ) {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let text = format_event(&event);
                if let Err(e) = send_message(&http_client, &api_url, &chat_id, &text).await {
                    error!(error = %e, event_type = %event.event_type, "Failed to send Telegram message");
                }
            }
            debug!("Telegram worker stopped");
        });
    }
}

/// Cuts a message to Telegram's limit without splitting a character.
pub(crate) fn truncate_message(text: &str) -> &str {
    if text.len() <= MAX_MESSAGE_LENGTH {
        return text;
    }

    let mut end = MAX_MESSAGE_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn send_message(
    http_client: &reqwest::Client,
    api_url: &str,
    chat_id: &str,
    text: &str,
) -> Result<(), NotificationError> {
    let url = format!("{}/sendMessage", api_url);

    let payload = serde_json::json!({
        "chat_id": chat_id,
        "text": truncate_message(text),
        "parse_mode": "Markdown"
    });

    let response = http_client
        .post(&url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| NotificationError::new(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(NotificationError::new(format!(
            "Telegram API error: {} - {}",
            status, body
        )));
    }

    Ok(())
}

/// Whether the given settings deliver events of this type.
pub(crate) fn event_enabled(config: &TelegramConfig, event_type: EventType) -> bool {
    match event_type {
        EventType::Startup | EventType::Shutdown => config.notify_lifecycle,
        EventType::Reconciliation => config.notify_reconciliation,
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        if !self.is_enabled(event.event_type) {
            return Ok(());
        }

        let text = format_event(event);
        send_message(&self.http_client, &self.api_url, &self.config.chat_id, &text).await
    }

    fn send_async(&self, event: Event) {
        if !self.is_enabled(event.event_type) {
            return;
        }

        if let Err(e) = self.sender.try_send(event) {
            error!(error = %e, "Failed to queue Telegram message");
        }
    }

    fn is_enabled(&self, event_type: EventType) -> bool {
        event_enabled(&self.config, event_type)
    }

    async fn close(&self) -> Result<(), NotificationError> {
        // Give the worker a moment to drain queued messages
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }
}
