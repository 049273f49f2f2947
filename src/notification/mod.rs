//! Operator notifications.

mod notifier;
mod telegram;

pub use notifier::{
    Event, EventType, NoopNotifier, NotificationError, Notifier, ReconciliationData,
    ShutdownData, StartupData, format_event,
};
pub use telegram::{TelegramConfig, TelegramNotifier};
