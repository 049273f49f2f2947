use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::time::Duration;

use crate::domain::format_money;

/// Notification event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Service started accepting requests.
    Startup,
    /// Service stopped.
    Shutdown,
    /// Money moved at the gateway but the order record could not be written.
    Reconciliation,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Startup => write!(f, "startup"),
            EventType::Shutdown => write!(f, "shutdown"),
            EventType::Reconciliation => write!(f, "reconciliation"),
        }
    }
}

/// Startup details.
#[derive(Debug, Clone)]
pub struct StartupData {
    pub app_name: String,
    pub version: String,
    /// Gateway environment, e.g. "sandbox".
    pub payment_mode: String,
    /// Order store backend, e.g. "sqlite".
    pub storage: String,
    pub address: String,
}

/// Shutdown details.
#[derive(Debug, Clone)]
pub struct ShutdownData {
    pub reason: String,
    pub uptime: Duration,
    pub graceful: bool,
}

/// A gateway operation succeeded but its order record is missing or stale.
#[derive(Debug, Clone)]
pub struct ReconciliationData {
    /// "capture" or "refund".
    pub operation: String,
    pub payment_id: Option<String>,
    /// Capture or refund reference returned by the gateway.
    pub reference: String,
    pub order_number: Option<String>,
    pub amount: Option<Decimal>,
    pub reason: String,
}

/// Event payload.
#[derive(Debug, Clone)]
pub enum EventData {
    Startup(StartupData),
    Shutdown(ShutdownData),
    Reconciliation(ReconciliationData),
}

/// Notification event.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub data: EventData,
}

impl Event {
    pub fn new(event_type: EventType, data: EventData) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn startup(data: StartupData) -> Self {
        Self::new(EventType::Startup, EventData::Startup(data))
    }

    pub fn shutdown(data: ShutdownData) -> Self {
        Self::new(EventType::Shutdown, EventData::Shutdown(data))
    }

    pub fn reconciliation(data: ReconciliationData) -> Self {
        Self::new(EventType::Reconciliation, EventData::Reconciliation(data))
    }
}

/// Notifier delivers operator alerts.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Sends an event and waits for delivery.
    async fn send(&self, event: &Event) -> Result<(), NotificationError>;

    /// Queues an event without blocking the caller.
    fn send_async(&self, event: Event);

    /// Returns true if events of this type are delivered.
    fn is_enabled(&self, event_type: EventType) -> bool;

    /// Flushes pending deliveries.
    async fn close(&self) -> Result<(), NotificationError>;
}

/// Notification error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("notification error: {message}")]
pub struct NotificationError {
    pub message: String,
}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// NoopNotifier drops every event. Used when no channel is configured.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _event: &Event) -> Result<(), NotificationError> {
        Ok(())
    }

    fn send_async(&self, _event: Event) {}

    fn is_enabled(&self, _event_type: EventType) -> bool {
        false
    }

    async fn close(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

// === Formatting ===

pub fn format_startup(data: &StartupData) -> String {
    format!(
        "🌱 *{} started*\n\n\
         Version: {}\n\
         PayPal: {}\n\
         Storage: {}\n\
         Listening: {}",
        escape_markdown(&data.app_name),
        data.version,
        data.payment_mode,
        data.storage,
        data.address
    )
}

pub fn format_shutdown(data: &ShutdownData) -> String {
    let status = if data.graceful {
        "✅ Graceful"
    } else {
        "⚠️ Forced"
    };

    format!(
        "🛑 *Service stopped*\n\n\
         Reason: {}\n\
         Status: {}\n\
         Uptime: {}",
        data.reason,
        status,
        format_duration(data.uptime)
    )
}

/// Formats a reconciliation alert. Identifiers are escaped because PayPal
/// ids may contain underscores.
pub fn format_reconciliation(data: &ReconciliationData) -> String {
    let amount = data
        .amount
        .map(|a| format!("\nAmount: {}", format_money(a)))
        .unwrap_or_default();
    let order = data
        .order_number
        .as_deref()
        .map(|n| format!("\nOrder: {}", escape_markdown(n)))
        .unwrap_or_default();

    format!(
        "🚨 *Reconciliation required*\n\n\
         Operation: {}\n\
         Payment: {}\n\
         Reference: {}{}{}\n\
         Reason: {}",
        data.operation,
        escape_markdown(data.payment_id.as_deref().unwrap_or("unknown")),
        escape_markdown(&data.reference),
        order,
        amount,
        escape_markdown(&data.reason)
    )
}

/// Formats an event body and stamps it with the time the event was raised.
pub fn format_event(event: &Event) -> String {
    let body = match &event.data {
        EventData::Startup(data) => format_startup(data),
        EventData::Shutdown(data) => format_shutdown(data),
        EventData::Reconciliation(data) => format_reconciliation(data),
    };
    format!("{}\n\n⏰ {}", body, event.timestamp.format("%H:%M:%S UTC"))
}

// === Helpers ===

/// Escapes characters that Telegram Markdown treats as formatting.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
