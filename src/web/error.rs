//! HTTP mapping of checkout errors.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::coordinator::CheckoutError;
use crate::gateway::GatewayError;

impl ResponseError for CheckoutError {
    fn status_code(&self) -> StatusCode {
        match self {
            CheckoutError::Validation(_) => StatusCode::BAD_REQUEST,
            CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
            CheckoutError::Conflict(_) => StatusCode::CONFLICT,
            CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::RecordkeepingFailed { .. } | CheckoutError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Responding with error");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Rejecting request");
        }

        let body = match self {
            CheckoutError::Validation(m)
            | CheckoutError::NotFound(m)
            | CheckoutError::Conflict(m) => json!({ "error": m }),
            CheckoutError::Gateway(GatewayError::Api(api)) => json!({
                "error": "Payment gateway error",
                "message": api.message,
                "name": api.name,
                "status": api.status,
                "debugId": api.debug_id,
                "details": api.details,
            }),
            CheckoutError::Gateway(other) => json!({
                "error": "Payment gateway error",
                "message": other.to_string(),
            }),
            CheckoutError::RecordkeepingFailed {
                operation,
                payment_id,
                reference,
                reason,
            } => json!({
                "error": format!("{} succeeded but the order could not be recorded", operation),
                "message": reason,
                "reconciliationRequired": true,
                "paymentId": payment_id,
                "reference": reference,
            }),
            CheckoutError::Storage(_) => json!({ "error": "Database operation failed" }),
        };

        HttpResponse::build(status).json(body)
    }
}
