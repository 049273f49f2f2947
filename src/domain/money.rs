//! Monetary helpers shared by pricing, persistence and the gateway.

use rust_decimal::{Decimal, RoundingStrategy};

/// The single currency the shop charges in.
pub const CURRENCY: &str = "USD";

/// Absolute tolerance when comparing two totals (one cent).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds an amount half away from zero to exactly two fractional digits.
///
/// The result always carries scale 2, so `10` becomes `10.00` when displayed
/// or serialized.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Returns true if the two totals differ by no more than one cent.
pub fn totals_match(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

/// Formats an amount as a dollar string, e.g. "$39.99".
pub fn format_money(amount: Decimal) -> String {
    format!("${}", round_money(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_pads_to_two_digits() {
        assert_eq!(round_money(dec!(10)).to_string(), "10.00");
        assert_eq!(round_money(dec!(29.9)).to_string(), "29.90");
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(59.975)), dec!(59.98));
    }

    #[test]
    fn test_totals_match_within_one_cent() {
        assert!(totals_match(dec!(39.99), dec!(39.99)));
        assert!(totals_match(dec!(39.99), dec!(40.00)));
        assert!(!totals_match(dec!(39.99), dec!(40.01)));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(59.98)), "$59.98");
        assert_eq!(format_money(dec!(0)), "$0.00");
    }
}
