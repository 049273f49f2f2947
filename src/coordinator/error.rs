//! Checkout error types.

use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Checkout error type.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Malformed or missing input, rejected before any external call.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The request is valid but clashes with the order's current state.
    #[error("{0}")]
    Conflict(String),

    /// The payment provider rejected or failed a call.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Money moved at the gateway but the order record could not be written.
    /// Requires manual reconciliation.
    #[error("{operation} succeeded at the gateway but the order could not be recorded: {reason}")]
    RecordkeepingFailed {
        operation: &'static str,
        payment_id: Option<String>,
        reference: String,
        reason: String,
    },

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for CheckoutError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate(what) => CheckoutError::Conflict(format!("Duplicate {}", what)),
            other => CheckoutError::Storage(other),
        }
    }
}
