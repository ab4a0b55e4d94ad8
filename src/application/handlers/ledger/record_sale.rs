//! RecordSaleHandler - Command handler turning a sale event into exactly
//! one immutable ledger entry.
//!
//! The sale-event source delivers at-least-once; the unique
//! `sale_reference` absorbs replays. Tier accounting rides behind the
//! ledger write as a best-effort step: its failure never rolls back the
//! recorded entry, and the entry's rate snapshot is taken before any
//! promotion this sale might cause.

use std::sync::Arc;

use crate::domain::foundation::{Money, SaleReference, Timestamp};
use crate::domain::ledger::{CommissionLedgerEntry, LedgerError};
use crate::domain::registry::ReferralCode;
use crate::domain::tiers::{TierSchedule, TierUpgrade};
use crate::ports::{
    AccountRepository, InsertEntryOutcome, LedgerRepository, QualifyingSaleOutcome, TierNotifier,
};

/// Command carrying one sale event.
#[derive(Debug, Clone)]
pub struct RecordSaleCommand {
    /// External idempotency key, e.g. the payment intent id.
    pub sale_reference: String,

    /// Code the sale is attributed to.
    pub referral_code: String,

    /// Sale amount in minor units.
    pub sale_amount_minor: i64,
}

/// Result of recording a sale.
#[derive(Debug, Clone)]
pub struct RecordSaleResult {
    /// The stored entry (new or replayed).
    pub entry: CommissionLedgerEntry,

    /// True when the sale reference had been processed before.
    pub replayed: bool,

    /// Promotion triggered by this sale, if any.
    pub upgrade: Option<TierUpgrade>,
}

/// Handler for recording sales into the commission ledger.
pub struct RecordSaleHandler {
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn LedgerRepository>,
    notifier: Arc<dyn TierNotifier>,
    schedule: Arc<TierSchedule>,
}

impl RecordSaleHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn LedgerRepository>,
        notifier: Arc<dyn TierNotifier>,
        schedule: Arc<TierSchedule>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            notifier,
            schedule,
        }
    }

    pub async fn handle(&self, cmd: RecordSaleCommand) -> Result<RecordSaleResult, LedgerError> {
        let sale_reference = SaleReference::new(cmd.sale_reference)
            .map_err(|e| LedgerError::invalid_amount(e.to_string()))?;
        let sale_amount = Money::from_minor_units(cmd.sale_amount_minor)
            .map_err(|e| LedgerError::invalid_amount(e.to_string()))?;

        // 1. Idempotent replay: same reference returns the stored entry
        //    unchanged, even if the replay carries a different amount or a
        //    garbled code.
        if let Some(existing) = self.ledger.find_by_sale_reference(&sale_reference).await? {
            tracing::debug!(
                sale_reference = %sale_reference,
                entry_id = %existing.id,
                "sale reference replayed"
            );
            return Ok(RecordSaleResult {
                entry: existing,
                replayed: true,
                upgrade: None,
            });
        }

        // 2. Resolve the referrer. The sale itself stays valid on failure;
        //    the caller logs and proceeds without commission.
        let code = ReferralCode::parse(&cmd.referral_code)
            .map_err(|_| LedgerError::unknown_referral(cmd.referral_code.clone()))?;
        let account = self
            .accounts
            .find_by_code(&code)
            .await?
            .ok_or_else(|| LedgerError::unknown_referral(code.as_str()))?;
        if !account.is_active() {
            return Err(LedgerError::referral_inactive(code.as_str()));
        }

        // 3. Snapshot the rate with a fresh read; a promotion landing
        //    between here and the insert affects the next entry, not this
        //    one.
        let rate_applied = self
            .accounts
            .current_rate(&account.id)
            .await?
            .ok_or_else(|| LedgerError::unknown_referral(code.as_str()))?;

        // 4-5. Compute and persist the Pending entry.
        let entry = match CommissionLedgerEntry::record(
            account.id,
            sale_reference.clone(),
            sale_amount,
            rate_applied,
            Timestamp::now(),
        ) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(
                    sale_reference = %sale_reference,
                    error = %e,
                    "commission invariant violated; entry not persisted"
                );
                return Err(e);
            }
        };

        let entry = match self.ledger.insert(&entry).await? {
            InsertEntryOutcome::Inserted => entry,
            // Lost a race with a concurrent delivery of the same sale.
            InsertEntryOutcome::DuplicateSaleReference(existing) => {
                return Ok(RecordSaleResult {
                    entry: existing,
                    replayed: true,
                    upgrade: None,
                });
            }
        };

        tracing::info!(
            entry_id = %entry.id,
            account_id = %entry.account_id,
            sale_amount = %entry.sale_amount,
            commission = %entry.commission_amount,
            rate = %entry.rate_applied,
            "commission recorded"
        );

        // 6. Tier accounting, best-effort relative to the ledger.
        let upgrade = self.apply_tier_accounting(&entry, &sale_reference).await;

        Ok(RecordSaleResult {
            entry,
            replayed: false,
            upgrade,
        })
    }

    /// Counts the sale toward the referrer's lifetime total.
    ///
    /// At-least-once safe: the store deduplicates by sale reference. A
    /// failure is logged and swallowed; the commission charged at the old
    /// rate stands either way.
    async fn apply_tier_accounting(
        &self,
        entry: &CommissionLedgerEntry,
        sale_reference: &SaleReference,
    ) -> Option<TierUpgrade> {
        let outcome = self
            .accounts
            .apply_qualifying_sale(
                &entry.account_id,
                sale_reference,
                entry.sale_amount,
                &self.schedule,
            )
            .await;

        let upgrade = match outcome {
            Ok(QualifyingSaleOutcome::Applied { upgrade, .. }) => upgrade,
            Ok(QualifyingSaleOutcome::AlreadyCounted) => None,
            Ok(QualifyingSaleOutcome::AccountNotFound) => {
                tracing::warn!(account_id = %entry.account_id, "account vanished during tier accounting");
                None
            }
            Err(e) => {
                tracing::warn!(
                    account_id = %entry.account_id,
                    error = %e,
                    "tier accounting failed; ledger entry stands"
                );
                None
            }
        };

        if let Some(upgrade) = &upgrade {
            // Fire-and-forget; the notification collaborator owns retries.
            if let Err(e) = self.notifier.tier_upgraded(upgrade).await {
                tracing::warn!(error = %e, "tier upgrade notification failed");
            }
        }

        upgrade
    }
}
