//! Order records and their payment/fulfillment state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{format_money, round_money};

/// Maximum length of the free-text note on an order.
pub const MAX_NOTE_LENGTH: usize = 500;

/// PaymentStatus is the gateway-facing state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Checkout initiated, nothing captured yet.
    Pending,
    /// Money captured at the gateway.
    Completed,
    /// Capture attempted and failed.
    Failed,
    /// Buyer or operator cancelled before capture.
    Cancelled,
    /// Captured money returned to the buyer.
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Cancelled,
        PaymentStatus::Refunded,
    ];

    /// Fulfillment status implied by moving to this payment status, if any.
    pub fn implied_fulfillment(self) -> Option<FulfillmentStatus> {
        match self {
            PaymentStatus::Completed => Some(FulfillmentStatus::Confirmed),
            PaymentStatus::Failed | PaymentStatus::Cancelled => Some(FulfillmentStatus::Cancelled),
            PaymentStatus::Pending | PaymentStatus::Refunded => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(format!(
                "Invalid payment status. Must be one of: {}",
                PaymentStatus::ALL.map(|s| s.to_string()).join(", ")
            )),
        }
    }
}

/// FulfillmentStatus tracks the order through the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    Processing,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    pub const ALL: [FulfillmentStatus; 5] = [
        FulfillmentStatus::Processing,
        FulfillmentStatus::Confirmed,
        FulfillmentStatus::Shipped,
        FulfillmentStatus::Delivered,
        FulfillmentStatus::Cancelled,
    ];
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::Processing => write!(f, "processing"),
            FulfillmentStatus::Confirmed => write!(f, "confirmed"),
            FulfillmentStatus::Shipped => write!(f, "shipped"),
            FulfillmentStatus::Delivered => write!(f, "delivered"),
            FulfillmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(FulfillmentStatus::Processing),
            "confirmed" => Ok(FulfillmentStatus::Confirmed),
            "shipped" => Ok(FulfillmentStatus::Shipped),
            "delivered" => Ok(FulfillmentStatus::Delivered),
            "cancelled" => Ok(FulfillmentStatus::Cancelled),
            _ => Err(format!(
                "Invalid order status. Must be one of: {}",
                FulfillmentStatus::ALL.map(|s| s.to_string()).join(", ")
            )),
        }
    }
}

/// PaymentProvider names the external gateway. Only PayPal is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[default]
    PayPal,
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::PayPal => write!(f, "paypal"),
        }
    }
}

/// LineItem is a product snapshot copied into the order at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product reference in the catalog.
    #[serde(alias = "productId")]
    pub product: String,
    /// Product name at the time of purchase.
    pub name: String,
    /// Unit price at the time of purchase.
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub eco_tags: Vec<String>,
}

impl LineItem {
    /// Unit price times quantity, rounded to cents. None on overflow.
    pub fn line_total(&self) -> Option<Decimal> {
        round_money(self.price)
            .checked_mul(Decimal::from(self.quantity))
            .map(round_money)
    }
}

/// ShippingAddress is the optional delivery address of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: Option<String>,
}

impl ShippingAddress {
    /// Names (camelCase) of the blank or absent fields.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zipCode", &self.zip_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}

fn default_country() -> Option<String> {
    Some("US".to_string())
}

/// Order represents a single purchase attempt and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Internal identifier (UUID v4).
    pub id: String,
    /// Human-readable order number, e.g. "ECO-LX2J9K1A-3F9A1C".
    pub order_number: String,
    pub items: Vec<LineItem>,
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Shipping charge applied at checkout.
    pub shipping: Decimal,
    /// Subtotal plus shipping. Immutable after creation.
    pub total_amount: Decimal,
    pub currency: String,
    pub buyer_email: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_provider: PaymentProvider,
    pub payment_status: PaymentStatus,
    /// Gateway payment intent identifier.
    pub payment_id: Option<String>,
    /// Gateway capture (sale) reference, used for refunds.
    pub capture_reference: Option<String>,
    #[serde(rename = "orderStatus")]
    pub fulfillment_status: FulfillmentStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new pending order with a fresh id and order number.
    pub fn new(
        items: Vec<LineItem>,
        subtotal: Decimal,
        shipping: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        let subtotal = round_money(subtotal);
        let shipping = round_money(shipping);
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            order_number: generate_order_number(now),
            items,
            subtotal,
            shipping,
            total_amount: round_money(subtotal + shipping),
            currency: currency.into(),
            buyer_email: None,
            shipping_address: None,
            payment_provider: PaymentProvider::PayPal,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            capture_reference: None,
            fulfillment_status: FulfillmentStatus::Processing,
            tracking_number: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the order may still be cancelled by the buyer.
    pub fn can_be_cancelled(&self) -> bool {
        self.fulfillment_status == FulfillmentStatus::Processing
            && self.payment_status != PaymentStatus::Completed
    }

    /// Total number of units across all line items.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Total formatted for display, e.g. "$39.99".
    pub fn formatted_total(&self) -> String {
        format_money(self.total_amount)
    }

    /// Applies a partial update in place. Items and totals are never touched.
    pub fn apply(&mut self, update: &OrderUpdate) {
        if let Some(status) = update.payment_status {
            self.payment_status = status;
        }
        if let Some(status) = update.fulfillment_status {
            self.fulfillment_status = status;
        }
        if let Some(ref id) = update.payment_id {
            self.payment_id = Some(id.clone());
        }
        if let Some(ref reference) = update.capture_reference {
            self.capture_reference = Some(reference.clone());
        }
        if let Some(ref email) = update.buyer_email {
            self.buyer_email = Some(email.clone());
        }
        if let Some(ref address) = update.shipping_address {
            self.shipping_address = Some(address.clone());
        }
        if let Some(ref tracking) = update.tracking_number {
            self.tracking_number = Some(tracking.clone());
        }
        if let Some(ref notes) = update.notes {
            self.notes = Some(notes.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// OrderUpdate lists the fields that may change after creation.
///
/// `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub payment_id: Option<String>,
    pub capture_reference: Option<String>,
    pub buyer_email: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

impl OrderUpdate {
    /// Update that moves the payment status and applies the implied fulfillment status.
    pub fn payment_status(status: PaymentStatus) -> Self {
        Self {
            payment_status: Some(status),
            fulfillment_status: status.implied_fulfillment(),
            ..Self::default()
        }
    }
}

/// Generates an order number of the form `ECO-<base36 millis>-<6 chars>`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let random: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect();

    format!("ECO-{}-{}", to_base36(millis), random.to_uppercase())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if n == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Trims and lower-cases an email, rejecting obviously malformed input.
///
/// Empty input yields `Ok(None)`.
pub fn normalize_email(raw: Option<&str>) -> Result<Option<String>, String> {
    let email = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(e) => e.to_lowercase(),
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(Some(email))
    } else {
        Err("Please provide a valid email address".to_string())
    }
}
