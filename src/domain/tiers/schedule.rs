//! Tier schedule - the ordered threshold/rate table.
//!
//! A schedule maps cumulative qualifying sales to a tier and its commission
//! rate. Thresholds and rates must both be strictly increasing, so a
//! promotion can never lower a referrer's rate.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CommissionRate, Money, ValidationError};

use super::Tier;

/// One row of the tier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDefinition {
    /// Tier this row grants.
    pub tier: Tier,

    /// Minimum lifetime qualifying sales (minor units) to hold this tier.
    pub min_lifetime_sales: Money,

    /// Commission rate granted by this tier.
    pub rate: CommissionRate,
}

/// Ordered, validated tier table.
///
/// # Invariants
///
/// - Non-empty; the first row's threshold is zero so every lifetime total
///   maps to a tier.
/// - Tier ranks, thresholds, and rates are all strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSchedule(Vec<TierDefinition>);

impl TierSchedule {
    /// Builds a schedule from rows, validating the ordering invariants.
    pub fn new(rows: Vec<TierDefinition>) -> Result<Self, ValidationError> {
        let first = rows.first().ok_or_else(|| {
            ValidationError::invalid_format("tier_schedule", "schedule cannot be empty")
        })?;
        if !first.min_lifetime_sales.is_zero() {
            return Err(ValidationError::invalid_format(
                "tier_schedule",
                "first tier threshold must be zero",
            ));
        }

        for pair in rows.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.tier.rank() <= lower.tier.rank() {
                return Err(ValidationError::invalid_format(
                    "tier_schedule",
                    format!(
                        "tiers out of order: {} does not outrank {}",
                        upper.tier, lower.tier
                    ),
                ));
            }
            if upper.min_lifetime_sales <= lower.min_lifetime_sales {
                return Err(ValidationError::invalid_format(
                    "tier_schedule",
                    format!("thresholds must be strictly increasing at {}", upper.tier),
                ));
            }
            if upper.rate.as_decimal() <= lower.rate.as_decimal() {
                return Err(ValidationError::invalid_format(
                    "tier_schedule",
                    format!("rates must be strictly increasing at {}", upper.tier),
                ));
            }
        }

        Ok(Self(rows))
    }

    /// Returns the highest row whose threshold the lifetime total meets.
    pub fn tier_for(&self, lifetime_sales: Money) -> &TierDefinition {
        self.0
            .iter()
            .rev()
            .find(|row| row.min_lifetime_sales <= lifetime_sales)
            .unwrap_or(&self.0[0])
    }

    /// Returns the row for a specific tier, if the schedule defines it.
    pub fn definition_of(&self, tier: Tier) -> Option<&TierDefinition> {
        self.0.iter().find(|row| row.tier == tier)
    }

    /// Returns the next row above the given tier, if any.
    ///
    /// Used for dashboard progress display.
    pub fn next_above(&self, tier: Tier) -> Option<&TierDefinition> {
        self.0.iter().find(|row| row.tier.outranks(&tier))
    }

    /// Returns the entry-level row.
    pub fn entry(&self) -> &TierDefinition {
        &self.0[0]
    }

    /// Returns all rows in ascending order.
    pub fn rows(&self) -> &[TierDefinition] {
        &self.0
    }
}

/// Built-in schedule used when no tier table is configured.
static DEFAULT_SCHEDULE: Lazy<TierSchedule> = Lazy::new(|| {
    let row = |tier, major_units, rate: &str| TierDefinition {
        tier,
        min_lifetime_sales: Money::from_major_units(major_units)
            .expect("default threshold is non-negative"),
        rate: CommissionRate::parse(rate).expect("default rate is in (0, 1]"),
    };
    TierSchedule::new(vec![
        row(Tier::Bronze, 0, "0.15"),
        row(Tier::Silver, 5_000, "0.20"),
        row(Tier::Gold, 25_000, "0.25"),
        row(Tier::Platinum, 100_000, "0.30"),
        row(Tier::Diamond, 500_000, "0.35"),
    ])
    .expect("default tier schedule is ordered")
});

impl Default for TierSchedule {
    fn default() -> Self {
        DEFAULT_SCHEDULE.clone()
    }
}
