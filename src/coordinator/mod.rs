//! Order lifecycle coordinator.
//!
//! Drives an order from checkout initiation through capture to a terminal
//! state, reconciling gateway outcomes with the order store. Money-moving
//! calls happen before the store write; when that write fails the caller gets
//! `RecordkeepingFailed` and operators get a reconciliation alert.

mod config;
mod error;
mod pricing;
mod types;

pub use config::CoordinatorConfig;
pub use error::CheckoutError;
pub use pricing::{Quote, ShippingPolicy, quote, validate_items};
pub use types::{
    CancelRequest, CaptureOutcome, CaptureRequest, CreateOrderRequest, IntentOutcome,
    IntentRequest, OrderPage, OrderPatch, OrderQuery, Pagination, PaymentStatusRequest,
    RefundOutcome, RefundRequest,
};

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::MismatchPolicy;
use crate::domain::{
    FulfillmentStatus, LineItem, MAX_NOTE_LENGTH, Order, OrderUpdate, PaymentStatus,
    normalize_email, round_money, totals_match,
};
use crate::gateway::{PaymentDetails, PaymentGateway, PaymentIntentRequest};
use crate::notification::{Event, Notifier, ReconciliationData};
use crate::storage::{DeleteOutcome, OrderFilter, OrderSort, OrderStore, SortField};

const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;

/// Coordinates the order store, the payment gateway and operator alerts.
pub struct Coordinator {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    /// Opens a payment intent for the cart and records a pending order for it.
    pub async fn create_intent(
        &self,
        request: IntentRequest,
    ) -> Result<IntentOutcome, CheckoutError> {
        validate_items(&request.items)?;
        if request.total_amount <= Decimal::ZERO {
            return Err(CheckoutError::Validation(
                "Valid total amount is required".to_string(),
            ));
        }

        let items = snapshot_items(request.items);
        let quote = quote(&items, &self.config.shipping)?;
        let total_corrected = self.check_declared_total(request.total_amount, &quote)?;

        let intent_request = PaymentIntentRequest {
            items: items.clone(),
            subtotal: quote.subtotal,
            shipping: quote.shipping,
            total: quote.total,
            currency: self.config.currency.clone(),
            return_url: non_empty(request.return_url)
                .unwrap_or_else(|| self.config.return_url.clone()),
            cancel_url: non_empty(request.cancel_url)
                .unwrap_or_else(|| self.config.cancel_url.clone()),
            description: self.config.description.clone(),
        };

        let intent = self
            .gateway
            .create_intent(&intent_request)
            .await
            .inspect_err(|e| warn!(error = %e, total = %quote.total, "Payment intent creation failed"))?;

        let mut order = Order::new(items, quote.subtotal, quote.shipping, &self.config.currency);
        order.payment_id = Some(intent.intent_id.clone());

        // Capture can still rebuild the order from the resubmitted payload
        let order_number = match self.store.insert(&order).await {
            Ok(saved) => Some(saved.order_number),
            Err(e) => {
                warn!(
                    payment_id = %intent.intent_id,
                    error = %e,
                    "Failed to record pending order"
                );
                None
            }
        };

        info!(
            payment_id = %intent.intent_id,
            order_number = order_number.as_deref().unwrap_or(""),
            subtotal = %quote.subtotal,
            shipping = %quote.shipping,
            total = %quote.total,
            "Payment intent created"
        );

        Ok(IntentOutcome {
            payment_id: intent.intent_id,
            approval_url: intent.approval_url,
            currency: self.config.currency.clone(),
            subtotal: quote.subtotal,
            shipping: quote.shipping,
            total: quote.total,
            total_corrected,
            order_number,
        })
    }

    /// Executes an approved intent and records the completed order.
    ///
    /// A pending order recorded at intent creation is authoritative for items
    /// and total; the payload then only contributes buyer email and address.
    pub async fn capture(&self, request: CaptureRequest) -> Result<CaptureOutcome, CheckoutError> {
        let payment_id = request.payment_id.trim().to_string();
        let payer_id = request.payer_id.trim().to_string();
        if payment_id.is_empty() || payer_id.is_empty() {
            return Err(CheckoutError::Validation(
                "Payment ID and Payer ID are required".to_string(),
            ));
        }

        let payload = request
            .order_data
            .filter(|p| !p.items.is_empty())
            .ok_or_else(|| {
                CheckoutError::Validation("Order data is required to create order".to_string())
            })?;
        let buyer_email = normalize_email(payload.buyer_email.as_deref())
            .map_err(CheckoutError::Validation)?;

        let (pending_id, mut order) = match self.store.find_by_payment_id(&payment_id).await? {
            Some(existing) if existing.payment_status == PaymentStatus::Pending => {
                if existing.items != snapshot_items(payload.items.clone()) {
                    warn!(
                        payment_id = %payment_id,
                        order_number = %existing.order_number,
                        "Ignoring resubmitted items that differ from the pending order"
                    );
                }
                (Some(existing.id.clone()), existing)
            }
            Some(existing) => {
                return Err(CheckoutError::Conflict(format!(
                    "Payment {} is already {}",
                    payment_id, existing.payment_status
                )));
            }
            None => {
                validate_items(&payload.items)?;
                let items = snapshot_items(payload.items);
                let quote = quote(&items, &self.config.shipping)?;
                if let Some(declared) = payload.total_amount {
                    self.check_declared_total(declared, &quote)?;
                }

                let mut order =
                    Order::new(items, quote.subtotal, quote.shipping, &self.config.currency);
                order.payment_id = Some(payment_id.clone());
                (None, order)
            }
        };

        let capture = self
            .gateway
            .capture(&payment_id, &payer_id, order.total_amount, &order.currency)
            .await
            .inspect_err(|e| warn!(payment_id = %payment_id, error = %e, "Payment capture failed"))?;

        let update = OrderUpdate {
            capture_reference: Some(capture.capture_reference.clone()),
            buyer_email,
            shipping_address: payload.shipping_address,
            ..OrderUpdate::payment_status(PaymentStatus::Completed)
        };

        let persisted = match pending_id {
            Some(ref id) => match self.store.update_fields(id, &update).await {
                Ok(Some(saved)) => Ok(saved),
                Ok(None) => Err("pending order no longer exists".to_string()),
                Err(e) => Err(e.to_string()),
            },
            None => {
                order.apply(&update);
                self.store.insert(&order).await.map_err(|e| e.to_string())
            }
        };

        match persisted {
            Ok(saved) => {
                info!(
                    payment_id = %payment_id,
                    capture_reference = %capture.capture_reference,
                    order_number = %saved.order_number,
                    total = %saved.total_amount,
                    "Payment captured"
                );
                Ok(CaptureOutcome {
                    order: saved,
                    capture,
                })
            }
            Err(reason) => Err(self.recordkeeping_failed(
                "capture",
                Some(payment_id),
                capture.capture_reference,
                Some(order.order_number),
                Some(order.total_amount),
                reason,
            )),
        }
    }

    /// Records a buyer cancellation. No gateway call is made.
    pub async fn cancel(&self, request: CancelRequest) -> Result<Order, CheckoutError> {
        let payment_id = request.payment_id.trim().to_string();
        if payment_id.is_empty() {
            return Err(CheckoutError::Validation("Payment ID is required".to_string()));
        }

        let payload = request.order_data.unwrap_or_default();
        let buyer_email = normalize_email(payload.buyer_email.as_deref())
            .map_err(CheckoutError::Validation)?;

        let update = OrderUpdate {
            buyer_email,
            shipping_address: payload.shipping_address.clone(),
            ..OrderUpdate::payment_status(PaymentStatus::Cancelled)
        };

        if let Some(existing) = self.store.find_by_payment_id(&payment_id).await? {
            return match existing.payment_status {
                PaymentStatus::Completed | PaymentStatus::Refunded => {
                    Err(CheckoutError::Conflict(format!(
                        "Payment {} has already been captured",
                        payment_id
                    )))
                }
                PaymentStatus::Cancelled => Ok(existing),
                PaymentStatus::Pending | PaymentStatus::Failed => {
                    let saved = self
                        .store
                        .update_fields(&existing.id, &update)
                        .await?
                        .ok_or_else(|| CheckoutError::NotFound("Order not found".to_string()))?;
                    info!(
                        payment_id = %payment_id,
                        order_number = %saved.order_number,
                        "Payment cancelled"
                    );
                    Ok(saved)
                }
            };
        }

        if payload.items.is_empty() {
            return Err(CheckoutError::Validation(
                "Order data is required to record a cancelled payment".to_string(),
            ));
        }
        validate_items(&payload.items)?;

        let items = snapshot_items(payload.items);
        let quote = quote(&items, &self.config.shipping)?;
        let mut order = Order::new(items, quote.subtotal, quote.shipping, &self.config.currency);
        order.payment_id = Some(payment_id.clone());
        order.apply(&update);

        let saved = self.store.insert(&order).await?;
        info!(
            payment_id = %payment_id,
            order_number = %saved.order_number,
            "Cancelled payment recorded"
        );
        Ok(saved)
    }

    /// Manually corrects an order's payment status.
    pub async fn update_payment_status(
        &self,
        id: &str,
        request: PaymentStatusRequest,
    ) -> Result<Order, CheckoutError> {
        let status: PaymentStatus = request
            .payment_status
            .trim()
            .parse()
            .map_err(CheckoutError::Validation)?;

        let update = OrderUpdate {
            payment_id: non_empty(request.payment_id),
            capture_reference: non_empty(request.capture_reference),
            ..OrderUpdate::payment_status(status)
        };

        let order = self
            .store
            .update_fields(id, &update)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("Order not found".to_string()))?;

        info!(
            order_number = %order.order_number,
            payment_status = %order.payment_status,
            order_status = %order.fulfillment_status,
            "Payment status updated"
        );
        Ok(order)
    }

    /// Refunds a captured sale, fully or partially.
    pub async fn refund(
        &self,
        capture_reference: &str,
        request: RefundRequest,
    ) -> Result<RefundOutcome, CheckoutError> {
        let capture_reference = capture_reference.trim();
        if capture_reference.is_empty() {
            return Err(CheckoutError::Validation("Payment ID is required".to_string()));
        }

        let amount = request.amount.map(round_money);
        if amount.is_some_and(|a| a <= Decimal::ZERO) {
            return Err(CheckoutError::Validation(
                "Refund amount must be greater than 0".to_string(),
            ));
        }

        let reason = non_empty(request.reason);
        if reason
            .as_ref()
            .is_some_and(|r| r.chars().count() > MAX_NOTE_LENGTH)
        {
            return Err(CheckoutError::Validation(format!(
                "Refund reason cannot exceed {} characters",
                MAX_NOTE_LENGTH
            )));
        }

        let order = self
            .store
            .find_by_capture_reference(capture_reference)
            .await?
            .ok_or_else(|| {
                CheckoutError::NotFound("Order not found for this payment".to_string())
            })?;

        if order.payment_status != PaymentStatus::Completed {
            return Err(CheckoutError::Conflict(format!(
                "Only completed payments can be refunded (order {} is {})",
                order.order_number, order.payment_status
            )));
        }

        if amount.is_some_and(|a| a > order.total_amount) {
            return Err(CheckoutError::Validation(format!(
                "Refund amount cannot exceed the order total of {}",
                order.formatted_total()
            )));
        }

        let refund = self
            .gateway
            .refund(capture_reference, amount, &order.currency)
            .await
            .inspect_err(|e| {
                warn!(capture_reference = %capture_reference, error = %e, "Refund failed")
            })?;

        let update = OrderUpdate {
            notes: Some(reason.unwrap_or_else(|| format!("Refunded: {}", refund.refund_reference))),
            ..OrderUpdate::payment_status(PaymentStatus::Refunded)
        };

        let persisted = match self.store.update_fields(&order.id, &update).await {
            Ok(Some(saved)) => Ok(saved),
            Ok(None) => Err("order no longer exists".to_string()),
            Err(e) => Err(e.to_string()),
        };

        match persisted {
            Ok(saved) => {
                info!(
                    order_number = %saved.order_number,
                    capture_reference = %capture_reference,
                    refund_reference = %refund.refund_reference,
                    amount = %amount.unwrap_or(saved.total_amount),
                    "Payment refunded"
                );
                Ok(RefundOutcome {
                    order: saved,
                    refund,
                })
            }
            Err(reason) => Err(self.recordkeeping_failed(
                "refund",
                order.payment_id.clone(),
                refund.refund_reference,
                Some(order.order_number),
                Some(amount.unwrap_or(order.total_amount)),
                reason,
            )),
        }
    }

    /// Looks an order up by internal id, or by order number when the id is
    /// not a UUID.
    pub async fn get_order(&self, id: &str) -> Result<Order, CheckoutError> {
        let id = id.trim();
        let order = if Uuid::parse_str(id).is_ok() {
            self.store.find_by_id(id).await?
        } else {
            self.store.find_by_order_number(&id.to_uppercase()).await?
        };

        order.ok_or_else(|| CheckoutError::NotFound("Order not found".to_string()))
    }

    /// Looks an order up by its order number, ignoring case.
    pub async fn get_order_by_number(&self, number: &str) -> Result<Order, CheckoutError> {
        let number = number.trim();
        if number.is_empty() {
            return Err(CheckoutError::Validation("Order number is required".to_string()));
        }

        self.store
            .find_by_order_number(&number.to_uppercase())
            .await?
            .ok_or_else(|| CheckoutError::NotFound("Order not found".to_string()))
    }

    /// Lists orders newest first.
    pub async fn list_orders(&self, query: OrderQuery) -> Result<OrderPage, CheckoutError> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(CheckoutError::Validation("page must be at least 1".to_string()));
        }

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(CheckoutError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }

        let filter = OrderFilter {
            buyer_email: normalize_email(query.email.as_deref()).map_err(CheckoutError::Validation)?,
            payment_status: non_empty(query.status)
                .map(|s| s.to_lowercase().parse::<PaymentStatus>())
                .transpose()
                .map_err(CheckoutError::Validation)?,
            sort: parse_sort(query.sort_by, query.sort_order)?,
        };

        let (orders, total) = self.store.list(&filter, page, limit).await?;
        debug!(page, limit, total, returned = orders.len(), "Orders listed");

        Ok(OrderPage {
            orders,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// Lists every order regardless of buyer or status.
    pub async fn order_history(&self, query: OrderQuery) -> Result<OrderPage, CheckoutError> {
        self.list_orders(OrderQuery {
            email: None,
            status: None,
            ..query
        })
        .await
    }

    /// Records an order entered outside the checkout flow, e.g. by support staff.
    ///
    /// Unlike checkout, the buyer email and a complete shipping address are
    /// required. Totals are priced server-side and the order starts pending.
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, CheckoutError> {
        validate_items(&request.items)?;

        let buyer_email = normalize_email(request.buyer_email.as_deref())
            .map_err(CheckoutError::Validation)?
            .ok_or_else(|| CheckoutError::Validation("Buyer email is required".to_string()))?;

        let address = request.shipping_address.ok_or_else(|| {
            CheckoutError::Validation("Shipping address is required".to_string())
        })?;
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::Validation(format!(
                "Missing required shipping address fields: {}",
                missing.join(", ")
            )));
        }

        let notes = non_empty(request.notes);
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH) {
            return Err(CheckoutError::Validation(format!(
                "Notes cannot exceed {} characters",
                MAX_NOTE_LENGTH
            )));
        }

        let items = snapshot_items(request.items);
        let quote = quote(&items, &self.config.shipping)?;
        let mut order = Order::new(items, quote.subtotal, quote.shipping, &self.config.currency);
        order.buyer_email = Some(buyer_email);
        order.shipping_address = Some(address);
        order.notes = notes;

        let saved = self.store.insert(&order).await?;
        info!(
            order_number = %saved.order_number,
            total = %saved.total_amount,
            "Order created"
        );
        Ok(saved)
    }

    /// Applies an administrative edit.
    ///
    /// A new payment status brings its implied fulfillment status unless the
    /// patch names one explicitly.
    pub async fn update_order(&self, id: &str, patch: OrderPatch) -> Result<Order, CheckoutError> {
        let payment_status = non_empty(patch.payment_status)
            .map(|s| s.parse::<PaymentStatus>())
            .transpose()
            .map_err(CheckoutError::Validation)?;
        let fulfillment_status = non_empty(patch.order_status)
            .map(|s| s.parse::<FulfillmentStatus>())
            .transpose()
            .map_err(CheckoutError::Validation)?;

        let notes = non_empty(patch.notes);
        if notes
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH)
        {
            return Err(CheckoutError::Validation(format!(
                "Notes cannot exceed {} characters",
                MAX_NOTE_LENGTH
            )));
        }

        let base = payment_status
            .map(OrderUpdate::payment_status)
            .unwrap_or_default();
        let update = OrderUpdate {
            fulfillment_status: fulfillment_status.or(base.fulfillment_status),
            tracking_number: non_empty(patch.tracking_number),
            shipping_address: patch.shipping_address,
            notes,
            ..base
        };

        let order = self
            .store
            .update_fields(id, &update)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("Order not found".to_string()))?;

        info!(
            order_number = %order.order_number,
            payment_status = %order.payment_status,
            order_status = %order.fulfillment_status,
            "Order updated"
        );
        Ok(order)
    }

    /// Deletes an order unless its payment has been captured.
    pub async fn delete_order(&self, id: &str) -> Result<Order, CheckoutError> {
        let order = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("Order not found".to_string()))?;

        // A capture may complete the order after the read; the store re-checks.
        match self.store.delete_unless_completed(&order.id).await? {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::NotFound => {
                return Err(CheckoutError::NotFound("Order not found".to_string()));
            }
            DeleteOutcome::Completed => {
                return Err(CheckoutError::Conflict(
                    "Cannot delete completed orders".to_string(),
                ));
            }
        }

        info!(order_number = %order.order_number, "Order deleted");
        Ok(order)
    }

    /// Fetches the gateway's view of a payment intent.
    pub async fn payment_details(&self, payment_id: &str) -> Result<PaymentDetails, CheckoutError> {
        let payment_id = payment_id.trim();
        if payment_id.is_empty() {
            return Err(CheckoutError::Validation("Payment ID is required".to_string()));
        }

        Ok(self.gateway.get_payment(payment_id).await?)
    }

    /// Applies the mismatch policy to a client-declared total.
    /// Returns true when the declared total was overridden.
    fn check_declared_total(&self, declared: Decimal, quote: &Quote) -> Result<bool, CheckoutError> {
        if totals_match(quote.total, round_money(declared)) {
            return Ok(false);
        }

        match self.config.mismatch_policy {
            MismatchPolicy::Reject => Err(CheckoutError::Validation(format!(
                "Total amount mismatch: calculated {}, received {}",
                quote.total,
                round_money(declared)
            ))),
            MismatchPolicy::Correct => {
                warn!(
                    calculated = %quote.total,
                    received = %round_money(declared),
                    "Total amount mismatch, using calculated total"
                );
                Ok(true)
            }
        }
    }

    /// Logs and alerts on a gateway success that could not be recorded.
    fn recordkeeping_failed(
        &self,
        operation: &'static str,
        payment_id: Option<String>,
        reference: String,
        order_number: Option<String>,
        amount: Option<Decimal>,
        reason: String,
    ) -> CheckoutError {
        error!(
            operation,
            payment_id = payment_id.as_deref().unwrap_or(""),
            reference = %reference,
            order_number = order_number.as_deref().unwrap_or(""),
            reason = %reason,
            "Gateway operation succeeded but order was not recorded; reconciliation required"
        );

        self.notifier.send_async(Event::reconciliation(ReconciliationData {
            operation: operation.to_string(),
            payment_id: payment_id.clone(),
            reference: reference.clone(),
            order_number,
            amount,
            reason: reason.clone(),
        }));

        CheckoutError::RecordkeepingFailed {
            operation,
            payment_id,
            reference,
            reason,
        }
    }
}

/// Copies line items into the order with prices rounded to cents.
fn snapshot_items(items: Vec<LineItem>) -> Vec<LineItem> {
    items
        .into_iter()
        .map(|item| LineItem {
            price: round_money(item.price),
            ..item
        })
        .collect()
}

/// Builds the listing order from `sortBy`/`sortOrder`, newest first by default.
fn parse_sort(
    sort_by: Option<String>,
    sort_order: Option<String>,
) -> Result<OrderSort, CheckoutError> {
    let field = non_empty(sort_by)
        .map(|s| s.parse::<SortField>())
        .transpose()
        .map_err(CheckoutError::Validation)?
        .unwrap_or_default();

    let descending = match non_empty(sort_order).map(|s| s.to_lowercase()).as_deref() {
        None | Some("desc") => true,
        Some("asc") => false,
        Some(_) => {
            return Err(CheckoutError::Validation(
                "Invalid sortOrder. Must be one of: asc, desc".to_string(),
            ));
        }
    };

    Ok(OrderSort { field, descending })
}

/// Trims an optional string, treating blank as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
