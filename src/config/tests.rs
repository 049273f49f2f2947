//! Tests for config module.

use super::*;
use rust_decimal_macros::dec;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

// ==================== Duration parsing tests ====================

#[test]
fn test_parse_duration_seconds() {
    let d = duration::parse_duration("30s").unwrap();
    assert_eq!(d, Duration::from_secs(30));
}

#[test]
fn test_parse_duration_minutes() {
    let d = duration::parse_duration("5m").unwrap();
    assert_eq!(d, Duration::from_secs(300));
}

#[test]
fn test_parse_duration_milliseconds() {
    let d = duration::parse_duration("250ms").unwrap();
    assert_eq!(d, Duration::from_millis(250));
}

#[test]
fn test_parse_duration_bare_number_is_seconds() {
    let d = duration::parse_duration("15").unwrap();
    assert_eq!(d, Duration::from_secs(15));
}

#[test]
fn test_parse_duration_empty() {
    let d = duration::parse_duration("").unwrap();
    assert_eq!(d, Duration::ZERO);
}

#[test]
fn test_parse_duration_invalid_unit() {
    let result = duration::parse_duration("10x");
    assert!(result.unwrap_err().contains("unknown duration unit"));
}

// ==================== YAML field loading tests ====================

/// Parse config from YAML string (for testing).
fn from_yaml(yaml: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(config)
}

fn minimal_valid_yaml() -> String {
    r#"
app:
  name: ecostyle
  env: development

paypal:
  return_url: http://localhost:3000/payment/success
  cancel_url: http://localhost:3000/payment/cancel
"#
    .to_string()
}

#[test]
fn test_minimal_config_defaults() {
    let cfg = from_yaml(&minimal_valid_yaml()).unwrap();

    assert_eq!(cfg.app.name, "ecostyle");
    assert!(cfg.app.is_development());
    assert_eq!(cfg.server.address(), "127.0.0.1:3000");
    assert_eq!(cfg.paypal.mode, PayPalMode::Sandbox);
    assert_eq!(cfg.paypal.timeout, Duration::ZERO);
    assert_eq!(cfg.checkout.mismatch_policy, MismatchPolicy::Correct);
    assert_eq!(cfg.checkout.free_shipping_threshold().unwrap(), dec!(50.00));
    assert_eq!(cfg.checkout.flat_shipping().unwrap(), dec!(10.00));
    assert!(cfg.storage.is_none());
    assert!(cfg.notification.is_none());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_load_paypal_fields() {
    let yaml = r#"
app:
  name: ecostyle
  env: production

paypal:
  mode: live
  return_url: https://shop.example.com/ok
  cancel_url: https://shop.example.com/cancel
  timeout: 15s
  description: EcoStyle order
"#;
    let cfg = from_yaml(yaml).unwrap();

    assert_eq!(cfg.paypal.mode, PayPalMode::Live);
    assert_eq!(cfg.paypal.api_url(), "https://api-m.paypal.com");
    assert_eq!(cfg.paypal.timeout, Duration::from_secs(15));
    assert_eq!(cfg.paypal.description.as_deref(), Some("EcoStyle order"));
    // Credentials are never read from YAML
    assert!(cfg.paypal.client_id.is_empty());
}

#[test]
fn test_paypal_base_url_override() {
    let yaml = r#"
app:
  name: ecostyle
  env: development

paypal:
  return_url: http://localhost/ok
  cancel_url: http://localhost/cancel
  base_url: http://127.0.0.1:9999
"#;
    let cfg = from_yaml(yaml).unwrap();
    assert_eq!(cfg.paypal.api_url(), "http://127.0.0.1:9999");
}

#[test]
fn test_load_checkout_fields() {
    let yaml = r#"
app:
  name: ecostyle
  env: development

paypal:
  return_url: http://localhost/ok
  cancel_url: http://localhost/cancel

checkout:
  free_shipping_threshold: "75.00"
  flat_shipping: "4.95"
  mismatch_policy: reject
"#;
    let cfg = from_yaml(yaml).unwrap();

    assert_eq!(cfg.checkout.free_shipping_threshold().unwrap(), dec!(75.00));
    assert_eq!(cfg.checkout.flat_shipping().unwrap(), dec!(4.95));
    assert_eq!(cfg.checkout.mismatch_policy, MismatchPolicy::Reject);
}

#[test]
fn test_load_server_and_storage_fields() {
    let yaml = r#"
app:
  name: ecostyle
  env: development

server:
  host: 0.0.0.0
  port: 8080
  workers: 4

paypal:
  return_url: http://localhost/ok
  cancel_url: http://localhost/cancel

storage:
  enabled: true
  path: orders.db
  max_connections: 3
"#;
    let cfg = from_yaml(yaml).unwrap();

    assert_eq!(cfg.server.address(), "0.0.0.0:8080");
    assert_eq!(cfg.server.workers, Some(4));

    let storage = cfg.storage.unwrap();
    assert!(storage.enabled);
    assert_eq!(storage.path.as_deref(), Some("orders.db"));
    assert_eq!(storage.max_connections, Some(3));
}

#[test]
fn test_load_notification_fields() {
    let yaml = r#"
app:
  name: ecostyle
  env: development

paypal:
  return_url: http://localhost/ok
  cancel_url: http://localhost/cancel

notification:
  telegram:
    enabled: true
    notify_lifecycle: true
"#;
    let cfg = from_yaml(yaml).unwrap();

    let telegram = cfg.notification.unwrap().telegram.unwrap();
    assert!(telegram.enabled);
    assert!(telegram.notify_lifecycle);
    assert!(telegram.notify_reconciliation);
    assert!(telegram.bot_token.is_empty());
}

#[test]
fn test_unknown_paypal_mode_fails_to_parse() {
    let yaml = minimal_valid_yaml().replace("paypal:\n", "paypal:\n  mode: staging\n");
    assert!(matches!(from_yaml(&yaml), Err(ConfigError::Parse(_))));
}

#[test]
fn test_unknown_mismatch_policy_fails_to_parse() {
    let yaml = format!("{}\ncheckout:\n  mismatch_policy: ignore\n", minimal_valid_yaml());
    assert!(matches!(from_yaml(&yaml), Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_paypal_section_fails_to_parse() {
    let yaml = r#"
app:
  name: ecostyle
  env: development
"#;
    assert!(from_yaml(yaml).is_err());
}

#[test]
fn test_paypal_mode_from_str() {
    assert_eq!("LIVE".parse::<PayPalMode>(), Ok(PayPalMode::Live));
    assert_eq!(" sandbox ".parse::<PayPalMode>(), Ok(PayPalMode::Sandbox));
    assert!("prod".parse::<PayPalMode>().is_err());
}

// ==================== Validation tests ====================

#[test]
fn test_validate_empty_app_name() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();
    cfg.app.name = String::new();

    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("app.name is required"));
}

#[test]
fn test_validate_production_requires_credentials() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();
    cfg.app.env = "production".to_string();

    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("PAYPAL_CLIENT_ID"));

    cfg.paypal.client_id = "id".to_string();
    cfg.paypal.client_secret = "secret".to_string();
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_validate_negative_shipping() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();
    cfg.checkout.flat_shipping = Some("-1".to_string());

    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("checkout.flat_shipping must not be negative"));
}

#[test]
fn test_validate_accepts_zero_shipping() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();
    cfg.checkout.flat_shipping = Some("0".to_string());
    cfg.checkout.free_shipping_threshold = Some("0.00".to_string());

    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.checkout.flat_shipping().unwrap(), dec!(0));
}

#[test]
fn test_validate_non_decimal_threshold() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();
    cfg.checkout.free_shipping_threshold = Some("fifty".to_string());

    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("checkout.free_shipping_threshold"));
}

#[test]
fn test_validate_enabled_storage_requires_path() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();
    cfg.storage = Some(StorageConfig {
        enabled: true,
        path: None,
        max_connections: None,
    });

    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("storage.path"));
}

#[test]
fn test_validate_zero_port() {
    let mut cfg = from_yaml(&minimal_valid_yaml()).unwrap();
    cfg.server.port = 0;
    assert!(cfg.validate().is_err());
}

// ==================== File loading tests ====================

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(minimal_valid_yaml().as_bytes()).unwrap();

    let cfg = Config::load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(cfg.app.name, "ecostyle");
}

#[test]
fn test_load_missing_file() {
    let result = Config::load("/nonexistent/config.yaml");
    assert!(matches!(result, Err(ConfigError::ReadFile(_))));
}

#[test]
fn test_load_invalid_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"app: [unclosed").unwrap();

    let result = Config::load(file.path().to_str().unwrap());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
