//! HTTP API over the checkout coordinator.

mod error;
pub mod handlers;
pub mod routes;

pub use routes::configure_routes;

use std::sync::Arc;

use serde::Serialize;

use crate::config::{PayPalConfig, PayPalMode};
use crate::coordinator::Coordinator;
use crate::domain::Order;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub checkout: PublicCheckoutConfig,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>, checkout: PublicCheckoutConfig) -> Self {
        Self {
            coordinator,
            checkout,
        }
    }
}

/// Gateway settings the browser SDK needs. Never carries the secret.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCheckoutConfig {
    pub client_id: String,
    pub mode: PayPalMode,
    pub currency: String,
}

impl PublicCheckoutConfig {
    pub fn from_config(cfg: &PayPalConfig, currency: &str) -> Self {
        Self {
            client_id: cfg.client_id.clone(),
            mode: cfg.mode,
            currency: currency.to_string(),
        }
    }
}

/// Order as returned by the API, with derived display fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub can_be_cancelled: bool,
    pub item_count: u64,
    pub formatted_total: String,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            can_be_cancelled: order.can_be_cancelled(),
            item_count: order.item_count(),
            formatted_total: order.formatted_total(),
            order,
        }
    }
}

#[cfg(test)]
mod tests;
