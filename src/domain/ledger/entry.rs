//! Commission ledger entry aggregate.
//!
//! The central financial record: one immutable entry per sale reference.
//! `sale_amount`, `rate_applied` and `commission_amount` are fixed at
//! creation; later tier promotions never touch an existing entry. Only the
//! settlement state, retry counter and settlement metadata change, and only
//! through the state machine.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CommissionRate, LedgerEntryId, Money, ReferralAccountId, SaleReference, StateMachine,
    Timestamp,
};

use super::{EntryState, LedgerError};

/// What happened to an entry after a failed payout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// Back to `Pending`, eligible for the next cycle.
    Requeued,

    /// Retry budget spent; parked in `Failed`.
    Exhausted,
}

/// One immutable commission record in a settlement lifecycle.
///
/// # Invariants
///
/// - `sale_reference` is unique across the ledger
/// - `commission_amount = round_half_even(sale_amount * rate_applied)`
/// - `commission_amount <= sale_amount`
/// - once `Settled`, nothing changes ever again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionLedgerEntry {
    /// Unique identifier, generated at creation, never reused.
    pub id: LedgerEntryId,

    /// Account earning the commission.
    pub account_id: ReferralAccountId,

    /// External idempotency key of the originating sale.
    pub sale_reference: SaleReference,

    /// Sale amount as recorded at sale time.
    pub sale_amount: Money,

    /// The referrer's rate at the moment the entry was created.
    pub rate_applied: CommissionRate,

    /// Commission owed, rounded half-even to minor units.
    pub commission_amount: Money,

    /// Settlement state.
    pub state: EntryState,

    /// Failed payout attempts so far.
    pub retry_count: u32,

    /// When the entry was recorded.
    pub created_at: Timestamp,

    /// When the entry settled; None until then.
    pub settled_at: Option<Timestamp>,

    /// Payment-rail transfer reference once settled.
    pub transfer_id: Option<String>,
}

impl CommissionLedgerEntry {
    /// Records a new entry for a sale.
    ///
    /// Computes the commission from the rate snapshot and checks the
    /// `commission <= sale` bound; a violation means the entry must not be
    /// persisted.
    pub fn record(
        account_id: ReferralAccountId,
        sale_reference: SaleReference,
        sale_amount: Money,
        rate_applied: CommissionRate,
        now: Timestamp,
    ) -> Result<Self, LedgerError> {
        let commission_amount = rate_applied.commission_for(sale_amount);
        if commission_amount > sale_amount {
            return Err(LedgerError::invariant_violation(format!(
                "commission {} exceeds sale {} at rate {}",
                commission_amount, sale_amount, rate_applied
            )));
        }

        Ok(Self {
            id: LedgerEntryId::new(),
            account_id,
            sale_reference,
            sale_amount,
            rate_applied,
            commission_amount,
            state: EntryState::Pending,
            retry_count: 0,
            created_at: now,
            settled_at: None,
            transfer_id: None,
        })
    }

    /// Returns true if the entry is pending and past the cool-down cutoff.
    pub fn is_due(&self, cutoff: Timestamp) -> bool {
        self.state == EntryState::Pending && self.created_at <= cutoff
    }

    /// Reserves the entry for an in-flight settlement cycle.
    pub fn schedule(&mut self) -> Result<(), LedgerError> {
        self.transition_to(EntryState::Scheduled, "schedule")
    }

    /// Marks the entry settled after a confirmed payout.
    pub fn settle(
        &mut self,
        transfer_id: impl Into<String>,
        settled_at: Timestamp,
    ) -> Result<(), LedgerError> {
        self.transition_to(EntryState::Settled, "settle")?;
        self.settled_at = Some(settled_at);
        self.transfer_id = Some(transfer_id.into());
        Ok(())
    }

    /// Releases a scheduled entry after a confirmed payout failure.
    ///
    /// Requeues to `Pending` while the retry budget lasts, otherwise parks
    /// the entry in `Failed`.
    pub fn release_for_retry(
        &mut self,
        max_retries: u32,
    ) -> Result<RetryDisposition, LedgerError> {
        self.retry_count += 1;
        if self.retry_count >= max_retries {
            self.transition_to(EntryState::Failed, "fail")?;
            Ok(RetryDisposition::Exhausted)
        } else {
            self.transition_to(EntryState::Pending, "requeue")?;
            Ok(RetryDisposition::Requeued)
        }
    }

    /// Parks the entry in `Failed` immediately (terminal rejection).
    pub fn fail(&mut self) -> Result<(), LedgerError> {
        self.transition_to(EntryState::Failed, "fail")
    }

    fn transition_to(&mut self, target: EntryState, attempted: &str) -> Result<(), LedgerError> {
        self.state = self
            .state
            .transition_to(target)
            .map_err(|_| LedgerError::invalid_state(self.state.to_string(), attempted))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(minor: i64) -> Money {
        Money::from_minor_units(minor).unwrap()
    }

    fn rate(s: &str) -> CommissionRate {
        CommissionRate::parse(s).unwrap()
    }

    fn sale_ref(s: &str) -> SaleReference {
        SaleReference::new(s).unwrap()
    }

    fn pending_entry() -> CommissionLedgerEntry {
        CommissionLedgerEntry::record(
            ReferralAccountId::new(),
            sale_ref("pi_test_1"),
            money(100_000),
            rate("0.15"),
            Timestamp::now(),
        )
        .unwrap()
    }

    // Construction

    #[test]
    fn record_computes_commission_from_snapshot_rate() {
        let entry = pending_entry();
        assert_eq!(entry.commission_amount, money(15_000));
        assert_eq!(entry.state, EntryState::Pending);
        assert_eq!(entry.retry_count, 0);
        assert!(entry.settled_at.is_none());
        assert!(entry.transfer_id.is_none());
    }

    #[test]
    fn commission_never_exceeds_sale() {
        let entry = CommissionLedgerEntry::record(
            ReferralAccountId::new(),
            sale_ref("pi_test_2"),
            money(1),
            rate("1"),
            Timestamp::now(),
        )
        .unwrap();
        assert!(entry.commission_amount <= entry.sale_amount);
    }

    // Eligibility

    #[test]
    fn entry_is_due_only_past_cutoff() {
        let entry = pending_entry();
        let before_creation = entry.created_at.minus_secs(60);
        let after_creation = entry.created_at.plus_secs(60);

        assert!(!entry.is_due(before_creation));
        assert!(entry.is_due(after_creation));
    }

    #[test]
    fn scheduled_entry_is_not_due() {
        let mut entry = pending_entry();
        entry.schedule().unwrap();
        assert!(!entry.is_due(entry.created_at.plus_secs(60)));
    }

    // Lifecycle

    #[test]
    fn happy_path_pending_scheduled_settled() {
        let mut entry = pending_entry();

        entry.schedule().unwrap();
        assert_eq!(entry.state, EntryState::Scheduled);

        let settled_at = Timestamp::now();
        entry.settle("tr_123", settled_at).unwrap();
        assert_eq!(entry.state, EntryState::Settled);
        assert_eq!(entry.settled_at, Some(settled_at));
        assert_eq!(entry.transfer_id.as_deref(), Some("tr_123"));
    }

    #[test]
    fn settled_entry_rejects_further_transitions() {
        let mut entry = pending_entry();
        entry.schedule().unwrap();
        entry.settle("tr_123", Timestamp::now()).unwrap();

        assert!(entry.schedule().is_err());
        assert!(entry.fail().is_err());
        assert!(entry.release_for_retry(5).is_err());
    }

    #[test]
    fn pending_entry_cannot_settle_directly() {
        let mut entry = pending_entry();
        assert!(entry.settle("tr_123", Timestamp::now()).is_err());
    }

    // Retry budget

    #[test]
    fn failed_payout_requeues_until_budget_spent() {
        let mut entry = pending_entry();

        entry.schedule().unwrap();
        let disposition = entry.release_for_retry(3).unwrap();
        assert_eq!(disposition, RetryDisposition::Requeued);
        assert_eq!(entry.state, EntryState::Pending);
        assert_eq!(entry.retry_count, 1);

        entry.schedule().unwrap();
        assert_eq!(entry.release_for_retry(3).unwrap(), RetryDisposition::Requeued);

        entry.schedule().unwrap();
        let disposition = entry.release_for_retry(3).unwrap();
        assert_eq!(disposition, RetryDisposition::Exhausted);
        assert_eq!(entry.state, EntryState::Failed);
        assert_eq!(entry.retry_count, 3);
    }

    #[test]
    fn failed_entry_is_terminal() {
        let mut entry = pending_entry();
        entry.schedule().unwrap();
        entry.fail().unwrap();

        assert!(entry.schedule().is_err());
        assert!(entry.settle("tr_1", Timestamp::now()).is_err());
    }
}
