//! Percentage and basis-point conversions on `Decimal`
//!
//! Conventions used across the workspace:
//!
//! - **fraction**: 0.015 means 1.5%
//! - **percent**: 1.5 means 1.5%
//!
//! Slippage compounding works on fractions; every user-facing field stores percent.

use rust_decimal::Decimal;

/// Multiplier between a fraction and a percent
pub const FRACTION_SCALE: Decimal = Decimal::ONE_HUNDRED;

/// Convert a fraction (0.015) to a percent (1.5)
pub fn fraction_to_percent(fraction: Decimal) -> Decimal {
    fraction * FRACTION_SCALE
}

/// Convert a percent (1.5) to a fraction (0.015)
pub fn percent_to_fraction(percent: Decimal) -> Decimal {
    percent / FRACTION_SCALE
}

/// `part` expressed as a percent of `whole`; zero when `whole` is not positive
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part / whole * FRACTION_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_fraction_round_trip() {
        assert_eq!(fraction_to_percent(dec!(0.015)), dec!(1.5));
        assert_eq!(percent_to_fraction(dec!(1.5)), dec!(0.015));
    }

    #[test]
    fn test_percent_of_zero_whole() {
        assert_eq!(percent_of(dec!(5), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_of(dec!(5), dec!(100)), dec!(5));
        assert_eq!(percent_of(dec!(-2), dec!(50)), dec!(-4));
    }
}
