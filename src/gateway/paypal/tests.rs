//! Tests for the PayPal client plumbing.

use super::client::{ClientConfig, parse_error_response, token_refresh_at};
use crate::config::{PayPalConfig, PayPalMode};
use reqwest::StatusCode;
use std::time::{Duration, Instant};

fn paypal_config() -> PayPalConfig {
    PayPalConfig {
        mode: PayPalMode::Sandbox,
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        return_url: "http://localhost/ok".to_string(),
        cancel_url: "http://localhost/cancel".to_string(),
        timeout: Duration::ZERO,
        description: None,
        base_url: None,
    }
}

#[test]
fn test_client_config_defaults_timeout() {
    let cfg = ClientConfig::from_config(&paypal_config());
    assert_eq!(cfg.timeout, Duration::from_secs(30));
    assert_eq!(cfg.base_url, "https://api-m.sandbox.paypal.com");
}

#[test]
fn test_client_config_honours_override() {
    let mut paypal = paypal_config();
    paypal.base_url = Some("http://127.0.0.1:9999/".to_string());
    paypal.timeout = Duration::from_secs(5);

    let cfg = ClientConfig::from_config(&paypal);
    assert_eq!(cfg.base_url, "http://127.0.0.1:9999");
    assert_eq!(cfg.timeout, Duration::from_secs(5));
}

#[test]
fn test_parse_rest_error() {
    let body = br#"{
        "name": "INSTRUMENT_DECLINED",
        "message": "The instrument presented was either declined by the processor or bank.",
        "debug_id": "abc123",
        "details": [{"issue": "INSTRUMENT_DECLINED"}]
    }"#;

    let err = parse_error_response(StatusCode::BAD_REQUEST, body);

    assert_eq!(err.status, 400);
    assert_eq!(err.name, "INSTRUMENT_DECLINED");
    assert_eq!(err.debug_id.as_deref(), Some("abc123"));
    assert_eq!(err.details[0]["issue"], "INSTRUMENT_DECLINED");
}

#[test]
fn test_parse_oauth_error() {
    let body = br#"{"error":"invalid_client","error_description":"Client Authentication failed"}"#;

    let err = parse_error_response(StatusCode::UNAUTHORIZED, body);

    assert_eq!(err.status, 401);
    assert_eq!(err.name, "invalid_client");
    assert_eq!(err.message, "Client Authentication failed");
    assert!(err.details.is_null());
}

#[test]
fn test_parse_non_json_error() {
    let err = parse_error_response(StatusCode::BAD_GATEWAY, b"upstream timeout");

    assert_eq!(err.status, 502);
    assert_eq!(err.name, "BAD_GATEWAY");
    assert_eq!(err.message, "upstream timeout");
}

#[test]
fn test_token_refresh_leaves_margin() {
    let now = Instant::now();

    assert_eq!(
        token_refresh_at(now, 32400),
        Some(now + Duration::from_secs(32340))
    );
    assert_eq!(token_refresh_at(now, 30), Some(now));
}

#[test]
fn test_token_refresh_rejects_absurd_lifetime() {
    assert_eq!(token_refresh_at(Instant::now(), u64::MAX), None);
}
