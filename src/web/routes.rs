use actix_web::{HttpResponse, web};

use crate::coordinator::CheckoutError;
use crate::web::handlers::{orders, paypal};

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Registers the `/api` scope. Extractor failures answer with the same JSON
/// error shape as the handlers.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| CheckoutError::Validation(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| CheckoutError::Validation(err.to_string()).into());

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .app_data(query_config)
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/paypal")
                    .route("/config", web::get().to(paypal::checkout_config))
                    .route("/create-payment", web::post().to(paypal::create_payment))
                    .route("/execute-payment", web::post().to(paypal::execute_payment))
                    .route("/cancel-payment", web::post().to(paypal::cancel_payment))
                    .route("/payment/{payment_id}", web::get().to(paypal::payment_details))
                    .route("/refund/{capture_reference}", web::post().to(paypal::refund)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::get().to(orders::list_orders))
                    .route("", web::post().to(orders::create_order))
                    .route("/history", web::get().to(orders::order_history))
                    .route(
                        "/order-number/{number}",
                        web::get().to(orders::get_order_by_number),
                    )
                    .route(
                        "/{id}/payment-status",
                        web::put().to(orders::update_payment_status),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(orders::get_order))
                            .route(web::put().to(orders::update_order))
                            .route(web::delete().to(orders::delete_order)),
                    ),
            ),
    );
}
