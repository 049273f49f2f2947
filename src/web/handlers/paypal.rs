//! Checkout endpoints driven by the storefront's PayPal flow.

use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::instrument;

use crate::coordinator::{
    CancelRequest, CaptureRequest, CheckoutError, IntentRequest, RefundRequest,
};
use crate::web::{AppState, OrderView};

pub async fn checkout_config(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.checkout)
}

#[instrument(name = "handler::create_payment", skip_all, fields(items = body.items.len()))]
pub async fn create_payment(
    state: web::Data<AppState>,
    body: web::Json<IntentRequest>,
) -> Result<HttpResponse, CheckoutError> {
    let outcome = state.coordinator.create_intent(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[instrument(name = "handler::execute_payment", skip_all, fields(payment_id = %body.payment_id))]
pub async fn execute_payment(
    state: web::Data<AppState>,
    body: web::Json<CaptureRequest>,
) -> Result<HttpResponse, CheckoutError> {
    let outcome = state.coordinator.capture(body.into_inner()).await?;
    let currency = outcome.order.currency.clone();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Payment completed successfully",
        "orderId": outcome.order.id,
        "orderNumber": outcome.order.order_number,
        "captureReference": outcome.capture.capture_reference,
        "state": outcome.capture.state,
        "currency": currency,
        "order": OrderView::from(outcome.order),
    })))
}

#[instrument(name = "handler::cancel_payment", skip_all, fields(payment_id = %body.payment_id))]
pub async fn cancel_payment(
    state: web::Data<AppState>,
    body: web::Json<CancelRequest>,
) -> Result<HttpResponse, CheckoutError> {
    let order = state.coordinator.cancel(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Payment cancelled",
        "order": OrderView::from(order),
    })))
}

#[instrument(name = "handler::payment_details", skip(state))]
pub async fn payment_details(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, CheckoutError> {
    let details = state.coordinator.payment_details(&path).await?;
    Ok(HttpResponse::Ok().json(json!({ "payment": details.raw })))
}

/// The body is optional; an empty body refunds the full sale.
#[instrument(name = "handler::refund", skip(state, body))]
pub async fn refund(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, CheckoutError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RefundRequest::default()
    } else {
        serde_json::from_slice::<RefundRequest>(&body)
            .map_err(|e| CheckoutError::Validation(format!("Invalid refund request: {}", e)))?
    };

    let outcome = state.coordinator.refund(&path, request).await?;
    let currency = outcome.order.currency.clone();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Refund processed successfully",
        "refund": {
            "id": outcome.refund.refund_reference,
            "state": outcome.refund.state,
        },
        "currency": currency,
        "order": OrderView::from(outcome.order),
    })))
}
