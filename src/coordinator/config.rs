//! Coordinator configuration.

use crate::config::{Config, ConfigError, MismatchPolicy};
use crate::coordinator::ShippingPolicy;
use crate::domain::CURRENCY;

/// Checkout settings injected into the coordinator at construction.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub shipping: ShippingPolicy,
    pub mismatch_policy: MismatchPolicy,
    /// Default buyer redirect after approval.
    pub return_url: String,
    /// Default buyer redirect after cancelling at the gateway.
    pub cancel_url: String,
    pub description: Option<String>,
    pub currency: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            shipping: ShippingPolicy::default(),
            mismatch_policy: MismatchPolicy::default(),
            return_url: "http://localhost:3000/payment/success".to_string(),
            cancel_url: "http://localhost:3000/payment/cancel".to_string(),
            description: None,
            currency: CURRENCY.to_string(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let shipping = ShippingPolicy {
            free_threshold: cfg
                .checkout
                .free_shipping_threshold()
                .map_err(ConfigError::Validation)?,
            flat_rate: cfg.checkout.flat_shipping().map_err(ConfigError::Validation)?,
        };

        Ok(Self {
            shipping,
            mismatch_policy: cfg.checkout.mismatch_policy,
            return_url: cfg.paypal.return_url.clone(),
            cancel_url: cfg.paypal.cancel_url.clone(),
            description: cfg.paypal.description.clone(),
            currency: CURRENCY.to_string(),
        })
    }
}
