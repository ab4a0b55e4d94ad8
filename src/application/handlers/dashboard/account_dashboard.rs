//! AccountDashboardHandler - Read-side rollup for a referrer.
//!
//! Aggregates registry state and ledger totals into the view a referrer
//! dashboard renders: code, tier, rate, lifetime figures, earnings by
//! bucket, and progress toward the next tier.

use std::sync::Arc;

use crate::domain::foundation::{CommissionRate, Money, OwnerId};
use crate::domain::registry::{ReferralCode, RegistryError};
use crate::domain::tiers::{Tier, TierSchedule};
use crate::ports::{AccountRepository, CommissionSummary, LedgerRepository};

/// Progress toward the next tier, if one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierProgress {
    /// The tier being worked toward.
    pub next_tier: Tier,

    /// Lifetime sales needed to reach it.
    pub next_threshold: Money,

    /// Percent of the span between the current and next thresholds
    /// already covered, clamped to 0..=100.
    pub percent: u8,
}

/// Everything the referrer dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub referral_code: ReferralCode,
    pub tier: Tier,
    pub current_rate: CommissionRate,
    pub lifetime_qualifying_sales: Money,
    pub lifetime_referral_count: u64,
    pub earnings: CommissionSummary,
    pub progress: Option<TierProgress>,
}

/// Handler building the dashboard view.
pub struct AccountDashboardHandler {
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn LedgerRepository>,
    schedule: Arc<TierSchedule>,
}

impl AccountDashboardHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn LedgerRepository>,
        schedule: Arc<TierSchedule>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            schedule,
        }
    }

    pub async fn handle(&self, owner_id: &OwnerId) -> Result<DashboardView, RegistryError> {
        let account = self
            .accounts
            .find_by_owner(owner_id)
            .await?
            .ok_or_else(|| RegistryError::unknown_referral(owner_id.as_str()))?;

        let earnings = self
            .ledger
            .account_summary(&account.id)
            .await
            .map_err(|e| RegistryError::infrastructure(e.message))?;

        let progress = self.schedule.next_above(account.tier).map(|next| {
            let current_floor = self
                .schedule
                .definition_of(account.tier)
                .map(|d| d.min_lifetime_sales)
                .unwrap_or(Money::ZERO);
            TierProgress {
                next_tier: next.tier,
                next_threshold: next.min_lifetime_sales,
                percent: progress_percent(
                    account.lifetime_qualifying_sales,
                    current_floor,
                    next.min_lifetime_sales,
                ),
            }
        });

        Ok(DashboardView {
            referral_code: account.referral_code,
            tier: account.tier,
            current_rate: account.current_rate,
            lifetime_qualifying_sales: account.lifetime_qualifying_sales,
            lifetime_referral_count: account.lifetime_referral_count,
            earnings,
            progress,
        })
    }
}

fn progress_percent(current: Money, floor: Money, ceiling: Money) -> u8 {
    let span = ceiling.minor_units().saturating_sub(floor.minor_units());
    if span <= 0 {
        return 100;
    }
    let covered = current.minor_units().saturating_sub(floor.minor_units());
    let percent = (covered as i128 * 100 / span as i128).clamp(0, 100);
    percent as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountRepository, InMemoryLedgerRepository};
    use crate::domain::foundation::{ReferralAccountId, SaleReference, Timestamp};
    use crate::domain::ledger::CommissionLedgerEntry;
    use crate::domain::registry::ReferralAccount;

    fn money(major: i64) -> Money {
        Money::from_major_units(major).unwrap()
    }

    struct Fixture {
        handler: AccountDashboardHandler,
        accounts: Arc<InMemoryAccountRepository>,
        ledger: Arc<InMemoryLedgerRepository>,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let handler = AccountDashboardHandler::new(
            accounts.clone(),
            ledger.clone(),
            Arc::new(TierSchedule::default()),
        );
        Fixture {
            handler,
            accounts,
            ledger,
        }
    }

    #[tokio::test]
    async fn dashboard_reports_tier_and_progress() {
        let fixture = fixture();
        let schedule = TierSchedule::default();
        let mut account = ReferralAccount::create(
            ReferralAccountId::new(),
            OwnerId::new("owner-1").unwrap(),
            ReferralCode::generate(),
            &schedule,
        );
        // Halfway between bronze (0) and silver (5000).
        account
            .apply_qualifying_sale(money(2_500), &schedule)
            .unwrap();
        fixture.accounts.insert(&account).await.unwrap();

        let entry = CommissionLedgerEntry::record(
            account.id,
            SaleReference::new("pi_1").unwrap(),
            money(2_500),
            account.current_rate,
            Timestamp::now(),
        )
        .unwrap();
        fixture.ledger.insert(&entry).await.unwrap();

        let view = fixture.handler.handle(&account.owner_id).await.unwrap();

        assert_eq!(view.tier, Tier::Bronze);
        assert_eq!(view.lifetime_qualifying_sales, money(2_500));
        assert_eq!(view.earnings.total_entries, 1);
        assert_eq!(view.earnings.outstanding, money(375));

        let progress = view.progress.unwrap();
        assert_eq!(progress.next_tier, Tier::Silver);
        assert_eq!(progress.next_threshold, money(5_000));
        assert_eq!(progress.percent, 50);
    }

    #[tokio::test]
    async fn top_tier_has_no_progress_target() {
        let fixture = fixture();
        let schedule = TierSchedule::default();
        let mut account = ReferralAccount::create(
            ReferralAccountId::new(),
            OwnerId::new("owner-1").unwrap(),
            ReferralCode::generate(),
            &schedule,
        );
        account
            .apply_qualifying_sale(money(600_000), &schedule)
            .unwrap();
        fixture.accounts.insert(&account).await.unwrap();

        let view = fixture.handler.handle(&account.owner_id).await.unwrap();
        assert_eq!(view.tier, Tier::Diamond);
        assert!(view.progress.is_none());
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let fixture = fixture();
        let err = fixture
            .handler
            .handle(&OwnerId::new("nobody").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownReferral(_)));
    }
}
