//! Order administration endpoints.

use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::instrument;

use crate::coordinator::{
    CheckoutError, CreateOrderRequest, OrderPatch, OrderQuery, PaymentStatusRequest,
};
use crate::web::{AppState, OrderView};

#[instrument(name = "handler::list_orders", skip(state))]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse, CheckoutError> {
    let page = state.coordinator.list_orders(query.into_inner()).await?;
    let orders: Vec<OrderView> = page.orders.into_iter().map(OrderView::from).collect();

    Ok(HttpResponse::Ok().json(json!({
        "orders": orders,
        "pagination": page.pagination,
    })))
}

#[instrument(name = "handler::order_history", skip(state))]
pub async fn order_history(
    state: web::Data<AppState>,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse, CheckoutError> {
    let page = state.coordinator.order_history(query.into_inner()).await?;
    let orders: Vec<OrderView> = page.orders.into_iter().map(OrderView::from).collect();

    Ok(HttpResponse::Ok().json(json!({
        "orders": orders,
        "pagination": page.pagination,
    })))
}

#[instrument(name = "handler::create_order", skip(state, body))]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, CheckoutError> {
    let order = state.coordinator.create_order(body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Order created successfully",
        "order": OrderView::from(order),
    })))
}

#[instrument(name = "handler::get_order_by_number", skip(state))]
pub async fn get_order_by_number(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, CheckoutError> {
    let order = state.coordinator.get_order_by_number(&path).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": OrderView::from(order) })))
}

#[instrument(name = "handler::get_order", skip(state))]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, CheckoutError> {
    let order = state.coordinator.get_order(&path).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": OrderView::from(order) })))
}

#[instrument(name = "handler::update_order", skip(state, body))]
pub async fn update_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<OrderPatch>,
) -> Result<HttpResponse, CheckoutError> {
    let order = state
        .coordinator
        .update_order(&path, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Order updated successfully",
        "order": OrderView::from(order),
    })))
}

#[instrument(name = "handler::update_payment_status", skip(state, body))]
pub async fn update_payment_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PaymentStatusRequest>,
) -> Result<HttpResponse, CheckoutError> {
    let request = body.into_inner();
    if request.payment_status.trim().is_empty() {
        return Err(CheckoutError::Validation(
            "Payment status is required".to_string(),
        ));
    }

    let order = state
        .coordinator
        .update_payment_status(&path, request)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Payment status updated successfully",
        "order": OrderView::from(order),
    })))
}

#[instrument(name = "handler::delete_order", skip(state))]
pub async fn delete_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, CheckoutError> {
    let order = state.coordinator.delete_order(&path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Order deleted successfully",
        "orderId": order.id,
        "orderNumber": order.order_number,
    })))
}
