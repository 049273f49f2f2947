//! Request and result records exchanged with the HTTP layer.
//!
//! Field names follow the camelCase JSON the storefront sends.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{LineItem, Order, ShippingAddress};
use crate::gateway::{Capture, Refund};

/// Checkout initiation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Total the client computed; verified against the server-side quote.
    pub total_amount: Decimal,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Order details the client resubmits on capture or cancellation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total_amount: Option<Decimal>,
    pub buyer_email: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

/// Buyer returned from the gateway with an approved payment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    #[serde(default)]
    pub payment_id: String,
    #[serde(default, alias = "PayerID")]
    pub payer_id: String,
    pub order_data: Option<OrderPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub payment_id: String,
    pub order_data: Option<OrderPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundRequest {
    /// Partial amount; the full sale is refunded when absent.
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
}

/// Manual payment status correction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    #[serde(default)]
    pub payment_status: String,
    pub payment_id: Option<String>,
    #[serde(alias = "paypalPaymentId")]
    pub capture_reference: Option<String>,
}

/// Administrative order edit. Items and totals are not editable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub payment_status: Option<String>,
    pub order_status: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub notes: Option<String>,
}

/// Order listing filters, sorting and paging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub email: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// One of createdAt, updatedAt, totalAmount, orderNumber, paymentStatus.
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    /// "asc" or "desc".
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

/// An order entered directly, without a payment intent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub buyer_email: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub notes: Option<String>,
}

/// A created payment intent and the pending order recorded for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentOutcome {
    pub payment_id: String,
    pub approval_url: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    /// True when the declared total was replaced by the computed one.
    pub total_corrected: bool,
    /// None when the pending order could not be recorded.
    pub order_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub order: Order,
    pub capture: Capture,
}

#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub order: Order,
    pub refund: Refund,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_orders: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(limit.max(1)));
        Self {
            current_page: page,
            total_pages,
            total_orders: total,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}
