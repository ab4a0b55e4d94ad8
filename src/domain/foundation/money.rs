//! Monetary value objects.
//!
//! All monetary amounts are stored as integer minor units (cents); floats
//! never touch money. Commission rates are decimal fractions and the single
//! place where fractional arithmetic happens, with banker's rounding back to
//! minor units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Minor units per major currency unit (cents per dollar).
const MINOR_PER_MAJOR: i64 = 100;

/// A non-negative monetary amount in minor units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Money = Money(0);

    /// Creates an amount from minor units, rejecting negative values.
    pub fn from_minor_units(minor_units: i64) -> Result<Self, ValidationError> {
        if minor_units < 0 {
            return Err(ValidationError::invalid_format(
                "amount",
                "monetary amounts cannot be negative",
            ));
        }
        Ok(Self(minor_units))
    }

    /// Creates an amount from whole major units (e.g. dollars).
    pub fn from_major_units(major_units: i64) -> Result<Self, ValidationError> {
        let minor = major_units.checked_mul(MINOR_PER_MAJOR).ok_or_else(|| {
            ValidationError::invalid_format("amount", "monetary amount overflows")
        })?;
        Self::from_minor_units(minor)
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition; None on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Sums an iterator of amounts; None on overflow.
    pub fn total(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_MAJOR,
            self.0 % MINOR_PER_MAJOR
        )
    }
}

/// A commission rate: a decimal fraction in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionRate(Decimal);

impl CommissionRate {
    /// Creates a rate, rejecting values outside `(0, 1]`.
    pub fn new(rate: Decimal) -> Result<Self, ValidationError> {
        if rate <= Decimal::ZERO || rate > Decimal::ONE {
            return Err(ValidationError::invalid_format(
                "rate",
                format!("commission rate must be in (0, 1], got {}", rate),
            ));
        }
        Ok(Self(rate))
    }

    /// Parses a rate from a decimal string like "0.15".
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let rate = s
            .parse::<Decimal>()
            .map_err(|e| ValidationError::invalid_format("rate", e.to_string()))?;
        Self::new(rate)
    }

    /// Returns the inner decimal fraction.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Computes the commission on a sale amount.
    ///
    /// The product is rounded to the currency's minor unit with
    /// round-half-even. Because the rate is at most 1 and the sale amount is
    /// non-negative, the result always satisfies `0 <= commission <= sale`.
    pub fn commission_for(&self, sale_amount: Money) -> Money {
        let product = Decimal::from(sale_amount.minor_units()) * self.0;
        let rounded = product.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        // A rate in (0, 1] cannot push the rounded product past the sale
        // amount or below zero, so the conversion is infallible.
        let minor = rounded.to_i64().unwrap_or(sale_amount.minor_units());
        Money(minor.clamp(0, sale_amount.minor_units()))
    }
}

impl fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rate(s: &str) -> CommissionRate {
        CommissionRate::parse(s).unwrap()
    }

    #[test]
    fn money_rejects_negative_amounts() {
        assert!(Money::from_minor_units(-1).is_err());
        assert!(Money::from_minor_units(0).is_ok());
    }

    #[test]
    fn money_from_major_units_scales_to_minor() {
        let m = Money::from_major_units(1000).unwrap();
        assert_eq!(m.minor_units(), 100_000);
    }

    #[test]
    fn money_displays_with_two_decimals() {
        let m = Money::from_minor_units(15_000).unwrap();
        assert_eq!(m.to_string(), "150.00");
        let m = Money::from_minor_units(7).unwrap();
        assert_eq!(m.to_string(), "0.07");
    }

    #[test]
    fn money_total_sums_amounts() {
        let total = Money::total(vec![
            Money::from_minor_units(100).unwrap(),
            Money::from_minor_units(250).unwrap(),
        ])
        .unwrap();
        assert_eq!(total.minor_units(), 350);
    }

    #[test]
    fn money_total_detects_overflow() {
        let total = Money::total(vec![Money(i64::MAX), Money(1)]);
        assert!(total.is_none());
    }

    #[test]
    fn rate_rejects_zero_and_above_one() {
        assert!(CommissionRate::parse("0").is_err());
        assert!(CommissionRate::parse("-0.1").is_err());
        assert!(CommissionRate::parse("1.01").is_err());
        assert!(CommissionRate::parse("1").is_ok());
        assert!(CommissionRate::parse("0.15").is_ok());
    }

    #[test]
    fn commission_for_bronze_sale_matches_expected() {
        // $1000.00 at 15% is exactly $150.00.
        let sale = Money::from_minor_units(100_000).unwrap();
        let commission = rate("0.15").commission_for(sale);
        assert_eq!(commission.minor_units(), 15_000);
        assert_eq!(commission.to_string(), "150.00");
    }

    #[test]
    fn commission_rounds_half_to_even() {
        // 101 * 0.5 = 50.5 -> 50 (even); 103 * 0.5 = 51.5 -> 52 (even).
        let half = rate("0.5");
        assert_eq!(
            half.commission_for(Money::from_minor_units(101).unwrap())
                .minor_units(),
            50
        );
        assert_eq!(
            half.commission_for(Money::from_minor_units(103).unwrap())
                .minor_units(),
            52
        );
    }

    #[test]
    fn commission_at_full_rate_equals_sale() {
        let sale = Money::from_minor_units(9_999).unwrap();
        assert_eq!(rate("1").commission_for(sale), sale);
    }

    #[test]
    fn commission_on_zero_sale_is_zero() {
        assert_eq!(rate("0.35").commission_for(Money::ZERO), Money::ZERO);
    }

    proptest! {
        #[test]
        fn commission_is_bounded_by_sale(minor in 0i64..1_000_000_000, pct in 1u32..=100) {
            let sale = Money::from_minor_units(minor).unwrap();
            let r = CommissionRate::new(Decimal::new(i64::from(pct), 2)).unwrap();
            let commission = r.commission_for(sale);
            prop_assert!(commission.minor_units() >= 0);
            prop_assert!(commission <= sale);
        }

        #[test]
        fn commission_matches_decimal_half_even(minor in 0i64..10_000_000, pct in 1u32..=100) {
            let sale = Money::from_minor_units(minor).unwrap();
            let r = CommissionRate::new(Decimal::new(i64::from(pct), 2)).unwrap();
            let expected = (Decimal::from(minor) * Decimal::new(i64::from(pct), 2))
                .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
            prop_assert_eq!(Decimal::from(r.commission_for(sale).minor_units()), expected);
        }
    }
}
