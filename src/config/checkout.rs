//! Checkout pricing configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

const DEFAULT_FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(5000, 0, 0, false, 2);
const DEFAULT_FLAT_SHIPPING: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);

/// What to do when the client-declared total disagrees with the computed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Replace the declared total with the computed one and log a warning.
    #[default]
    Correct,
    /// Reject the checkout with a validation error.
    Reject,
}

/// Shipping and total-verification settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutConfig {
    /// Subtotals strictly above this ship free (decimal string, default "50.00").
    pub free_shipping_threshold: Option<String>,
    /// Flat shipping charge below the threshold (decimal string, default "10.00").
    pub flat_shipping: Option<String>,
    /// Declared-total mismatch handling.
    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,
}

impl CheckoutConfig {
    /// Free shipping threshold, falling back to the default when unset.
    pub fn free_shipping_threshold(&self) -> Result<Decimal, String> {
        parse_amount(
            self.free_shipping_threshold.as_deref(),
            DEFAULT_FREE_SHIPPING_THRESHOLD,
            "checkout.free_shipping_threshold",
        )
    }

    /// Flat shipping rate, falling back to the default when unset.
    pub fn flat_shipping(&self) -> Result<Decimal, String> {
        parse_amount(
            self.flat_shipping.as_deref(),
            DEFAULT_FLAT_SHIPPING,
            "checkout.flat_shipping",
        )
    }
}

fn parse_amount(raw: Option<&str>, default: Decimal, field: &str) -> Result<Decimal, String> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    let value = Decimal::from_str(raw.trim())
        .map_err(|e| format!("{} is not a decimal: {}", field, e))?;

    if value.is_sign_negative() {
        return Err(format!("{} must not be negative", field));
    }

    Ok(value)
}
