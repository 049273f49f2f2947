//! Server-side order pricing.

use rust_decimal::Decimal;

use crate::coordinator::CheckoutError;
use crate::domain::{LineItem, round_money};

/// Flat-rate shipping that becomes free above a subtotal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Subtotals strictly greater than this ship free.
    pub free_threshold: Decimal,
    pub flat_rate: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Decimal::from(50),
            flat_rate: Decimal::from(10),
        }
    }
}

impl ShippingPolicy {
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_threshold {
            round_money(Decimal::ZERO)
        } else {
            round_money(self.flat_rate)
        }
    }
}

/// Authoritative amounts for a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Prices line items. Each line is rounded to cents before summing.
///
/// Amounts that do not fit a `Decimal` are rejected as a validation error.
pub fn quote(items: &[LineItem], policy: &ShippingPolicy) -> Result<Quote, CheckoutError> {
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| {
            item.line_total().and_then(|line| sum.checked_add(line))
        })
        .map(round_money)
        .ok_or_else(out_of_range)?;
    let shipping = policy.shipping_for(subtotal);
    let total = subtotal.checked_add(shipping).ok_or_else(out_of_range)?;

    Ok(Quote {
        subtotal,
        shipping,
        total: round_money(total),
    })
}

fn out_of_range() -> CheckoutError {
    CheckoutError::Validation("Order total is out of range".to_string())
}

/// Rejects empty carts and lines with a non-positive price or quantity.
pub fn validate_items(items: &[LineItem]) -> Result<(), CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::Validation("Items are required".to_string()));
    }

    for (index, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(CheckoutError::Validation(format!(
                "Item {} must have a name",
                index + 1
            )));
        }
        if item.price <= Decimal::ZERO {
            return Err(CheckoutError::Validation(format!(
                "Item price must be greater than 0 (item {})",
                index + 1
            )));
        }
        if item.quantity == 0 {
            return Err(CheckoutError::Validation(format!(
                "Item quantity must be greater than 0 (item {})",
                index + 1
            )));
        }
    }

    Ok(())
}
