use super::*;
use crate::coordinator::{CheckoutError, CoordinatorConfig};
use crate::gateway::{
    ApiError, Capture, GatewayError, PaymentDetails, PaymentGateway, PaymentIntent,
    PaymentIntentRequest, Refund,
};
use crate::notification::NoopNotifier;
use crate::storage::MemoryStorage;
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct StubGateway {
    intents: AtomicUsize,
    decline: AtomicBool,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(
        &self,
        _request: &PaymentIntentRequest,
    ) -> crate::gateway::Result<PaymentIntent> {
        if self.decline.load(Ordering::SeqCst) {
            return Err(GatewayError::Api(ApiError {
                status: 422,
                name: "VALIDATION_ERROR".to_string(),
                message: "Invalid request - see details".to_string(),
                debug_id: Some("abc123".to_string()),
                details: json!([{ "field": "transactions[0].amount", "issue": "Amount mismatch" }]),
            }));
        }
        let n = self.intents.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            intent_id: format!("PAYID-{}", n),
            approval_url: format!("https://paypal.test/approve?token=EC-{}", n),
        })
    }

    async fn capture(
        &self,
        intent_id: &str,
        _payer_id: &str,
        _total: Decimal,
        _currency: &str,
    ) -> crate::gateway::Result<Capture> {
        Ok(Capture {
            capture_reference: format!("SALE-{}", intent_id),
            state: "completed".to_string(),
        })
    }

    async fn refund(
        &self,
        _capture_reference: &str,
        _amount: Option<Decimal>,
        _currency: &str,
    ) -> crate::gateway::Result<Refund> {
        Ok(Refund {
            refund_reference: "REFUND-1".to_string(),
            state: "completed".to_string(),
        })
    }

    async fn get_payment(&self, intent_id: &str) -> crate::gateway::Result<PaymentDetails> {
        Ok(PaymentDetails {
            id: intent_id.to_string(),
            state: "created".to_string(),
            raw: json!({ "id": intent_id, "state": "created", "links": [] }),
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn app_state(gateway: Arc<StubGateway>) -> AppState {
    let coordinator = Coordinator::new(
        Arc::new(MemoryStorage::new()),
        gateway,
        Arc::new(NoopNotifier),
        CoordinatorConfig::default(),
    );
    AppState::new(
        Arc::new(coordinator),
        PublicCheckoutConfig {
            client_id: "client-abc".to_string(),
            mode: PayPalMode::Sandbox,
            currency: "USD".to_string(),
        },
    )
}

macro_rules! init_app {
    ($gateway:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(app_state($gateway)))
                .configure(configure_routes),
        )
        .await
    };
}

fn tee(quantity: u32) -> Value {
    json!({
        "productId": "prod-1",
        "name": "Organic Cotton Tee",
        "price": "29.99",
        "quantity": quantity,
        "ecoTags": ["organic-cotton"],
    })
}

#[actix_web::test]
async fn test_health() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_public_config_hides_secret() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::get().uri("/api/paypal/config").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["clientId"], "client-abc");
    assert_eq!(body["mode"], "sandbox");
    assert_eq!(body["currency"], "USD");
    assert_eq!(body.as_object().map(|o| o.len()), Some(3));
}

#[actix_web::test]
async fn test_create_payment_returns_computed_total() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/create-payment")
        .set_json(json!({ "items": [tee(1)], "totalAmount": 39.99 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["paymentId"], "PAYID-1");
    assert_eq!(body["approvalUrl"], "https://paypal.test/approve?token=EC-1");
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["total"], "39.99");
    assert_eq!(body["shipping"], "10.00");
    assert_eq!(body["totalCorrected"], false);
    assert!(body["orderNumber"].as_str().unwrap().starts_with("ECO-"));
}

#[actix_web::test]
async fn test_create_payment_validation_error_shape() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/create-payment")
        .set_json(json!({ "items": [], "totalAmount": 10 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Items are required");
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/create-payment")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"items\": [")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_gateway_error_is_forwarded() {
    let gateway = Arc::new(StubGateway::default());
    gateway.decline.store(true, Ordering::SeqCst);
    let app = init_app!(gateway);

    let req = test::TestRequest::post()
        .uri("/api/paypal/create-payment")
        .set_json(json!({ "items": [tee(1)], "totalAmount": 39.99 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "VALIDATION_ERROR");
    assert_eq!(body["status"], 422);
    assert_eq!(body["debugId"], "abc123");
    assert_eq!(body["details"][0]["issue"], "Amount mismatch");
}

#[actix_web::test]
async fn test_execute_payment_requires_order_data() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/execute-payment")
        .set_json(json!({ "paymentId": "PAYID-1", "payerId": "PAYER-1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Order data is required to create order");
}

#[actix_web::test]
async fn test_checkout_flow_end_to_end() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/create-payment")
        .set_json(json!({ "items": [tee(2)], "totalAmount": 59.98 }))
        .to_request();
    let intent: Value = test::call_and_read_body_json(&app, req).await;
    let order_number = intent["orderNumber"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/paypal/execute-payment")
        .set_json(json!({
            "paymentId": intent["paymentId"],
            "PayerID": "PAYER-1",
            "orderData": {
                "items": [tee(2)],
                "totalAmount": 59.98,
                "buyerEmail": "Shopper@Example.com",
                "shippingAddress": { "street": "1 Green St", "city": "Portland" }
            }
        }))
        .to_request();
    let captured: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(captured["success"], true);
    assert_eq!(captured["orderNumber"], order_number.as_str());
    assert_eq!(captured["captureReference"], "SALE-PAYID-1");
    assert_eq!(captured["order"]["paymentStatus"], "completed");
    assert_eq!(captured["order"]["orderStatus"], "confirmed");
    assert_eq!(captured["order"]["buyerEmail"], "shopper@example.com");
    assert_eq!(captured["order"]["shippingAddress"]["country"], "US");
    assert_eq!(captured["order"]["canBeCancelled"], false);

    let uri = format!("/api/orders/order-number/{}", order_number.to_lowercase());
    let req = test::TestRequest::get().uri(&uri).to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found["order"]["orderNumber"], order_number.as_str());
    assert_eq!(found["order"]["formattedTotal"], "$59.98");
    assert_eq!(found["order"]["itemCount"], 2);

    let req = test::TestRequest::post()
        .uri("/api/paypal/refund/SALE-PAYID-1")
        .set_json(json!({ "reason": "Wrong size" }))
        .to_request();
    let refunded: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(refunded["refund"]["id"], "REFUND-1");
    assert_eq!(refunded["order"]["paymentStatus"], "refunded");
    assert_eq!(refunded["order"]["notes"], "Wrong size");
}

#[actix_web::test]
async fn test_refund_with_empty_body_and_unknown_reference() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/refund/SALE-UNKNOWN")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Order not found for this payment");
}

#[actix_web::test]
async fn test_cancel_and_delete_orders() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/cancel-payment")
        .set_json(json!({ "paymentId": "PAYID-X", "orderData": { "items": [tee(1)] } }))
        .to_request();
    let cancelled: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cancelled["order"]["paymentStatus"], "cancelled");
    assert_eq!(cancelled["order"]["orderStatus"], "cancelled");
    let id = cancelled["order"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/orders/{}", id))
        .to_request();
    let deleted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(deleted["orderId"], id.as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_delete_completed_order_is_conflict() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/execute-payment")
        .set_json(json!({
            "paymentId": "PAYID-EXT",
            "payerId": "PAYER-1",
            "orderData": { "items": [tee(1)], "totalAmount": 39.99 }
        }))
        .to_request();
    let captured: Value = test::call_and_read_body_json(&app, req).await;
    let id = captured["orderId"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/orders/{}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Cannot delete completed orders");
}

#[actix_web::test]
async fn test_order_admin_updates() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::post()
        .uri("/api/paypal/create-payment")
        .set_json(json!({ "items": [tee(1)], "totalAmount": 39.99 }))
        .to_request();
    let intent: Value = test::call_and_read_body_json(&app, req).await;
    let number = intent["orderNumber"].as_str().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{}/payment-status", number))
        .set_json(json!({ "paymentStatus": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    // Payment status updates address orders by internal id
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{}", number))
        .to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    let id = found["order"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{}/payment-status", id))
        .set_json(json!({ "paymentStatus": "paid" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{}/payment-status", id))
        .set_json(json!({ "paymentStatus": "completed" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["order"]["orderStatus"], "confirmed");

    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{}", id))
        .set_json(json!({
            "orderStatus": "shipped",
            "trackingNumber": "1Z999",
            "totalAmount": "1.00"
        }))
        .to_request();
    let shipped: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(shipped["order"]["orderStatus"], "shipped");
    assert_eq!(shipped["order"]["trackingNumber"], "1Z999");
    assert_eq!(shipped["order"]["totalAmount"], "39.99");
}

#[actix_web::test]
async fn test_list_orders_pagination() {
    let app = init_app!(Arc::new(StubGateway::default()));

    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/paypal/create-payment")
            .set_json(json!({ "items": [tee(1)], "totalAmount": 39.99 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    let req = test::TestRequest::get()
        .uri("/api/orders?page=2&limit=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["currentPage"], 2);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["totalOrders"], 3);
    assert_eq!(body["pagination"]["hasNext"], false);
    assert_eq!(body["pagination"]["hasPrev"], true);

    let req = test::TestRequest::get()
        .uri("/api/orders?limit=500")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/orders?page=abc")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_create_order_and_history() {
    let app = init_app!(Arc::new(StubGateway::default()));
    let address = json!({
        "street": "1 Green St",
        "city": "Portland",
        "state": "OR",
        "zipCode": "97201",
        "country": "US",
    });

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "items": [tee(2)],
            "buyerEmail": "Walkin@Example.com",
            "shippingAddress": address,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["message"], "Order created successfully");
    assert_eq!(created["order"]["buyerEmail"], "walkin@example.com");
    assert_eq!(created["order"]["totalAmount"], "59.98");
    assert_eq!(created["order"]["paymentStatus"], "pending");

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({ "items": [tee(1)], "shippingAddress": address }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/paypal/create-payment")
        .set_json(json!({ "items": [tee(1)], "totalAmount": 39.99 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get()
        .uri("/api/orders/history?sortBy=totalAmount&sortOrder=asc&status=cancelled")
        .to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    let orders = history["orders"].as_array().unwrap();
    assert_eq!(history["pagination"]["totalOrders"], 2);
    assert_eq!(orders[0]["totalAmount"], "39.99");
    assert_eq!(orders[1]["totalAmount"], "59.98");

    let req = test::TestRequest::get()
        .uri("/api/orders?sortBy=price")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_payment_details_passthrough() {
    let app = init_app!(Arc::new(StubGateway::default()));

    let req = test::TestRequest::get()
        .uri("/api/paypal/payment/PAYID-42")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["payment"]["id"], "PAYID-42");
    assert_eq!(body["payment"]["state"], "created");
}

#[actix_web::test]
async fn test_recordkeeping_error_response() {
    use actix_web::ResponseError;

    let err = CheckoutError::RecordkeepingFailed {
        operation: "capture",
        payment_id: Some("PAYID-1".to_string()),
        reference: "SALE-1".to_string(),
        reason: "database is locked".to_string(),
    };
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = err.error_response();
    let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["reconciliationRequired"], true);
    assert_eq!(body["paymentId"], "PAYID-1");
    assert_eq!(body["reference"], "SALE-1");
    assert_eq!(body["message"], "database is locked");
}
