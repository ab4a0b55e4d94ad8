//! Referral account aggregate.
//!
//! One account per opted-in user. The account owns the referral code, the
//! lifetime qualifying-sales accumulator, and the current tier/rate pair.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: the accumulator is integer cents, never a
//!   float.
//! - **Promotion only**: tier and rate move upward; a computed-lower tier is
//!   never stored.
//! - **Rate changes are prospective**: promoting updates `current_rate`,
//!   which only affects entries created afterwards.
//! - **Never deleted**: accounts are deactivated, keeping historical
//!   attribution intact.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CommissionRate, DomainError, ErrorCode, Money, OwnerId, ReferralAccountId, Timestamp,
};
use crate::domain::tiers::{Tier, TierSchedule, TierUpgrade};

use super::ReferralCode;

/// Whether an account participates in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Earning commissions.
    Active,

    /// Opted out or suspended; the code still resolves for analytics but
    /// no longer earns commissions.
    Deactivated,
}

/// Referral account aggregate.
///
/// # Invariants
///
/// - `referral_code` is unique and immutable once issued
/// - `lifetime_qualifying_sales` and `lifetime_referral_count` are
///   monotonically non-decreasing
/// - `tier` never decreases; `current_rate` always matches a schedule row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralAccount {
    /// Unique identifier for this account.
    pub id: ReferralAccountId,

    /// Owner in the external user system.
    pub owner_id: OwnerId,

    /// The code sales are attributed to.
    pub referral_code: ReferralCode,

    /// Rate applied to entries created from now on.
    pub current_rate: CommissionRate,

    /// Current reward tier.
    pub tier: Tier,

    /// Cumulative qualifying sales, minor units.
    pub lifetime_qualifying_sales: Money,

    /// Number of qualifying sales counted.
    pub lifetime_referral_count: u64,

    /// Participation status.
    pub status: AccountStatus,

    /// When the account was created.
    pub created_at: Timestamp,

    /// When the account was last updated.
    pub updated_at: Timestamp,
}

impl ReferralAccount {
    /// Creates a new account at the schedule's entry tier.
    pub fn create(
        id: ReferralAccountId,
        owner_id: OwnerId,
        referral_code: ReferralCode,
        schedule: &TierSchedule,
    ) -> Self {
        let entry = schedule.entry();
        let now = Timestamp::now();
        Self {
            id,
            owner_id,
            referral_code,
            current_rate: entry.rate,
            tier: entry.tier,
            lifetime_qualifying_sales: Money::ZERO,
            lifetime_referral_count: 0,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the account currently earns commissions.
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Counts a qualifying sale and recomputes the tier.
    ///
    /// Returns the upgrade if the new lifetime total crosses a threshold.
    /// The monotonic guard keeps the stored tier when the schedule would
    /// compute a lower one.
    ///
    /// Callers are responsible for per-account serialization (row lock or
    /// equivalent) and for idempotency per sale reference.
    pub fn apply_qualifying_sale(
        &mut self,
        sale_amount: Money,
        schedule: &TierSchedule,
    ) -> Result<Option<TierUpgrade>, DomainError> {
        let new_total = self
            .lifetime_qualifying_sales
            .checked_add(sale_amount)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InvariantViolation,
                    "lifetime qualifying sales overflowed",
                )
            })?;

        self.lifetime_qualifying_sales = new_total;
        self.lifetime_referral_count += 1;
        self.updated_at = Timestamp::now();

        let computed = schedule.tier_for(new_total);
        if !computed.tier.outranks(&self.tier) {
            return Ok(None);
        }

        let old_tier = self.tier;
        self.tier = computed.tier;
        self.current_rate = computed.rate;

        Ok(Some(TierUpgrade {
            account_id: self.id,
            old_tier,
            new_tier: computed.tier,
            new_rate: computed.rate,
            occurred_at: self.updated_at,
        }))
    }

    /// Takes the account out of the program.
    ///
    /// Idempotent; the code keeps resolving for analytics.
    pub fn deactivate(&mut self) {
        self.status = AccountStatus::Deactivated;
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(major: i64) -> Money {
        Money::from_major_units(major).unwrap()
    }

    fn rate(s: &str) -> CommissionRate {
        CommissionRate::parse(s).unwrap()
    }

    fn test_account(schedule: &TierSchedule) -> ReferralAccount {
        ReferralAccount::create(
            ReferralAccountId::new(),
            OwnerId::new("owner-1").unwrap(),
            ReferralCode::generate(),
            schedule,
        )
    }

    #[test]
    fn new_account_starts_at_entry_tier() {
        let schedule = TierSchedule::default();
        let account = test_account(&schedule);

        assert_eq!(account.tier, Tier::Bronze);
        assert_eq!(account.current_rate, rate("0.15"));
        assert_eq!(account.lifetime_qualifying_sales, Money::ZERO);
        assert_eq!(account.lifetime_referral_count, 0);
        assert!(account.is_active());
    }

    #[test]
    fn qualifying_sale_accumulates_lifetime_totals() {
        let schedule = TierSchedule::default();
        let mut account = test_account(&schedule);

        let upgrade = account
            .apply_qualifying_sale(money(1_000), &schedule)
            .unwrap();

        assert!(upgrade.is_none());
        assert_eq!(account.lifetime_qualifying_sales, money(1_000));
        assert_eq!(account.lifetime_referral_count, 1);
        assert_eq!(account.tier, Tier::Bronze);
    }

    #[test]
    fn crossing_threshold_promotes_and_raises_rate() {
        let schedule = TierSchedule::default();
        let mut account = test_account(&schedule);

        account
            .apply_qualifying_sale(money(1_000), &schedule)
            .unwrap();
        let upgrade = account
            .apply_qualifying_sale(money(4_500), &schedule)
            .unwrap()
            .expect("5500 lifetime crosses the silver threshold");

        assert_eq!(upgrade.old_tier, Tier::Bronze);
        assert_eq!(upgrade.new_tier, Tier::Silver);
        assert_eq!(upgrade.new_rate, rate("0.20"));
        assert_eq!(account.tier, Tier::Silver);
        assert_eq!(account.current_rate, rate("0.20"));
        assert_eq!(account.lifetime_qualifying_sales, money(5_500));
    }

    #[test]
    fn single_sale_can_skip_tiers() {
        let schedule = TierSchedule::default();
        let mut account = test_account(&schedule);

        let upgrade = account
            .apply_qualifying_sale(money(30_000), &schedule)
            .unwrap()
            .unwrap();

        assert_eq!(upgrade.new_tier, Tier::Gold);
        assert_eq!(account.current_rate, rate("0.25"));
    }

    #[test]
    fn tier_never_decreases() {
        let schedule = TierSchedule::default();
        let mut account = test_account(&schedule);
        account.tier = Tier::Gold;
        account.current_rate = rate("0.25");

        // Lifetime total still maps to bronze; the stored gold tier stays.
        let upgrade = account.apply_qualifying_sale(money(10), &schedule).unwrap();

        assert!(upgrade.is_none());
        assert_eq!(account.tier, Tier::Gold);
        assert_eq!(account.current_rate, rate("0.25"));
    }

    #[test]
    fn lifetime_totals_are_monotone_across_sales() {
        let schedule = TierSchedule::default();
        let mut account = test_account(&schedule);

        let mut last_total = Money::ZERO;
        let mut last_rank = account.tier.rank();
        for amount in [5, 700, 12_000, 1, 90_000, 3] {
            account
                .apply_qualifying_sale(money(amount), &schedule)
                .unwrap();
            assert!(account.lifetime_qualifying_sales >= last_total);
            assert!(account.tier.rank() >= last_rank);
            last_total = account.lifetime_qualifying_sales;
            last_rank = account.tier.rank();
        }
    }

    #[test]
    fn deactivate_is_idempotent() {
        let schedule = TierSchedule::default();
        let mut account = test_account(&schedule);

        account.deactivate();
        assert!(!account.is_active());
        account.deactivate();
        assert_eq!(account.status, AccountStatus::Deactivated);
    }
}
