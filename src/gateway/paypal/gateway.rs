use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::PayPalConfig;
use crate::domain::round_money;
use crate::gateway::paypal::client::{Client, ClientError};
use crate::gateway::{
    Capture, GatewayError, PaymentDetails, PaymentGateway, PaymentIntent, PaymentIntentRequest,
    Refund, Result,
};

const GATEWAY_NAME: &str = "paypal";

const DEFAULT_DESCRIPTION: &str = "EcoStyle Sustainable Fashion Purchase";

/// PayPal payments (v1 REST, "sale" intent).
pub struct PayPalGateway {
    client: Client,
    description: String,
}

impl PayPalGateway {
    /// Creates a new PayPalGateway from the gateway config.
    pub fn from_config(config: &PayPalConfig) -> Result<Self> {
        let client = Client::from_config(config)?;

        info!(
            mode = %config.mode,
            base_url = %client.base_url(),
            "paypal gateway configured"
        );

        Ok(Self {
            client,
            description: config
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        })
    }
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api(api) => GatewayError::Api(api),
            ClientError::Auth(reason) => GatewayError::Auth(reason),
            ClientError::Json(e) => GatewayError::InvalidResponse(e.to_string()),
            ClientError::Request(e) => GatewayError::Connection(e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct Sale {
    id: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct RelatedResource {
    sale: Option<Sale>,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    #[serde(default)]
    related_resources: Vec<RelatedResource>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    #[serde(default)]
    state: String,
}

/// Derives a stable idempotency key for a money-moving call.
///
/// The same operation on the same intent always yields the same key, so a
/// caller retry is deduplicated by PayPal.
pub fn request_id(operation: &str, reference: &str, amount: Option<Decimal>) -> String {
    let data = match amount {
        Some(amount) => format!("{}|{}|{}", operation, reference, round_money(amount)),
        None => format!("{}|{}", operation, reference),
    };

    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Formats an amount the way PayPal expects it ("39.99").
fn amount_string(amount: Decimal) -> String {
    round_money(amount).to_string()
}

/// Builds the body for `POST /v1/payments/payment`.
pub(crate) fn build_payment_body(request: &PaymentIntentRequest, description: &str) -> Value {
    let items: Vec<Value> = request
        .items
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "sku": item.product,
                "price": amount_string(item.price),
                "currency": request.currency,
                "quantity": item.quantity,
            })
        })
        .collect();

    json!({
        "intent": "sale",
        "payer": { "payment_method": "paypal" },
        "redirect_urls": {
            "return_url": request.return_url,
            "cancel_url": request.cancel_url,
        },
        "transactions": [{
            "item_list": { "items": items },
            "amount": {
                "currency": request.currency,
                "total": amount_string(request.total),
                "details": {
                    "subtotal": amount_string(request.subtotal),
                    "shipping": amount_string(request.shipping),
                    "tax": "0.00",
                },
            },
            "description": request.description.as_deref().unwrap_or(description),
        }],
    })
}

/// Builds the body for `POST /v1/payments/payment/{id}/execute`.
pub(crate) fn build_execute_body(payer_id: &str, total: Decimal, currency: &str) -> Value {
    json!({
        "payer_id": payer_id,
        "transactions": [{
            "amount": {
                "currency": currency,
                "total": amount_string(total),
            },
        }],
    })
}

/// Builds the body for `POST /v1/payments/sale/{id}/refund`. An empty body
/// refunds the full sale.
pub(crate) fn build_refund_body(amount: Option<Decimal>, currency: &str) -> Value {
    match amount {
        Some(amount) => json!({
            "amount": {
                "total": amount_string(amount),
                "currency": currency,
            },
        }),
        None => json!({}),
    }
}

/// Extracts the buyer approval link from a created payment.
fn approval_url(payment: &PaymentResponse) -> Result<String> {
    payment
        .links
        .iter()
        .find(|link| link.rel == "approval_url")
        .map(|link| link.href.clone())
        .ok_or_else(|| GatewayError::InvalidResponse("approval_url link not found".to_string()))
}

/// Extracts the sale created by executing a payment.
fn executed_sale(payment: &PaymentResponse) -> Result<&Sale> {
    payment
        .transactions
        .first()
        .and_then(|t| t.related_resources.iter().find_map(|r| r.sale.as_ref()))
        .ok_or_else(|| GatewayError::InvalidResponse("sale not found in executed payment".to_string()))
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    async fn create_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent> {
        let body = build_payment_body(request, &self.description);

        let raw = self
            .client
            .request(Method::POST, "/v1/payments/payment", Some(&body), None)
            .await?;

        let payment: PaymentResponse = serde_json::from_slice(&raw)
            .map_err(|e| GatewayError::InvalidResponse(format!("parse payment: {}", e)))?;

        let approval_url = approval_url(&payment)?;

        debug!(
            intent_id = %payment.id,
            state = %payment.state,
            total = %request.total,
            "payment intent created"
        );

        Ok(PaymentIntent {
            intent_id: payment.id,
            approval_url,
        })
    }

    async fn capture(
        &self,
        intent_id: &str,
        payer_id: &str,
        total: Decimal,
        currency: &str,
    ) -> Result<Capture> {
        let endpoint = format!(
            "/v1/payments/payment/{}/execute",
            urlencoding::encode(intent_id)
        );
        let body = build_execute_body(payer_id, total, currency);
        let idempotency_key = request_id("execute", intent_id, None);

        let raw = self
            .client
            .request(Method::POST, &endpoint, Some(&body), Some(&idempotency_key))
            .await?;

        let payment: PaymentResponse = serde_json::from_slice(&raw)
            .map_err(|e| GatewayError::InvalidResponse(format!("parse executed payment: {}", e)))?;

        let sale = executed_sale(&payment)?;

        debug!(
            intent_id = %intent_id,
            capture_reference = %sale.id,
            state = %payment.state,
            "payment executed"
        );

        Ok(Capture {
            capture_reference: sale.id.clone(),
            state: if sale.state.is_empty() {
                payment.state.clone()
            } else {
                sale.state.clone()
            },
        })
    }

    async fn refund(
        &self,
        capture_reference: &str,
        amount: Option<Decimal>,
        currency: &str,
    ) -> Result<Refund> {
        let endpoint = format!(
            "/v1/payments/sale/{}/refund",
            urlencoding::encode(capture_reference)
        );
        let body = build_refund_body(amount, currency);
        let idempotency_key = request_id("refund", capture_reference, amount);

        let raw = self
            .client
            .request(Method::POST, &endpoint, Some(&body), Some(&idempotency_key))
            .await?;

        let refund: RefundResponse = serde_json::from_slice(&raw)
            .map_err(|e| GatewayError::InvalidResponse(format!("parse refund: {}", e)))?;

        debug!(
            capture_reference = %capture_reference,
            refund_reference = %refund.id,
            state = %refund.state,
            "sale refunded"
        );

        Ok(Refund {
            refund_reference: refund.id,
            state: refund.state,
        })
    }

    async fn get_payment(&self, intent_id: &str) -> Result<PaymentDetails> {
        let endpoint = format!("/v1/payments/payment/{}", urlencoding::encode(intent_id));

        let raw = self
            .client
            .request::<Value>(Method::GET, &endpoint, None, None)
            .await?;

        let document: Value = serde_json::from_slice(&raw)
            .map_err(|e| GatewayError::InvalidResponse(format!("parse payment: {}", e)))?;

        let id = document
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(intent_id)
            .to_string();
        let state = document
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(PaymentDetails {
            id,
            state,
            raw: document,
        })
    }

    fn name(&self) -> &str {
        GATEWAY_NAME
    }
}
