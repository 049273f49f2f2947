//! Payment gateway abstractions and implementations.

pub mod paypal;

use crate::domain::LineItem;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

pub use paypal::PayPalGateway;

/// Error reported by the gateway API itself.
#[derive(Debug, Clone, Error, Serialize)]
#[error("gateway error {status} {name}: {message}")]
pub struct ApiError {
    /// HTTP status of the gateway response.
    pub status: u16,
    /// Provider error name, e.g. "INSTRUMENT_DECLINED".
    pub name: String,
    pub message: String,
    pub debug_id: Option<String>,
    /// Raw provider `details` payload, `null` when absent.
    pub details: serde_json::Value,
}

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered with an error response.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The gateway could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The gateway answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Credentials were rejected or could not be exchanged for a token.
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Everything the gateway needs to open a payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub return_url: String,
    pub cancel_url: String,
    pub description: Option<String>,
}

/// A freshly created payment intent awaiting buyer approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub intent_id: String,
    /// Where the buyer authorizes the payment.
    pub approval_url: String,
}

/// Outcome of executing an approved intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Sale reference used later for refunds.
    pub capture_reference: String,
    pub state: String,
}

/// Outcome of a refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refund {
    pub refund_reference: String,
    pub state: String,
}

/// The gateway's current view of a payment intent.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub id: String,
    pub state: String,
    /// Full provider document, passed through to support tooling.
    pub raw: serde_json::Value,
}

/// PaymentGateway defines the interface for moving money at an external provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// CreateIntent opens a payment for the given items and total.
    /// The buyer must approve it at `approval_url` before it can be captured.
    async fn create_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent>;

    /// Capture executes an approved intent for exactly `total` in `currency`.
    /// Retrying with the same arguments does not charge twice.
    async fn capture(
        &self,
        intent_id: &str,
        payer_id: &str,
        total: Decimal,
        currency: &str,
    ) -> Result<Capture>;

    /// Refund returns money for a captured sale. `None` refunds the full amount.
    async fn refund(
        &self,
        capture_reference: &str,
        amount: Option<Decimal>,
        currency: &str,
    ) -> Result<Refund>;

    /// GetPayment fetches the provider's view of a payment intent.
    async fn get_payment(&self, intent_id: &str) -> Result<PaymentDetails>;

    /// Name returns the provider identifier (e.g., "paypal").
    fn name(&self) -> &str;
}
