//! Ledger repository port (commission entry storage).
//!
//! The ledger store is the single source of truth for money owed. The
//! operations here carry the settlement protocol's correctness load:
//!
//! - `insert` enforces the unique `sale_reference` constraint and hands the
//!   existing entry back on a duplicate, which is what makes webhook
//!   replays harmless.
//! - `claim_due` is the per-entry reservation step: the Pending->Scheduled
//!   transition must be atomic per entry so two overlapping cycles can
//!   never both claim the same entry. It also returns entries a previous,
//!   interrupted cycle left in `Scheduled`.
//! - `mark_settled` commits a whole confirmed group as one unit.

use async_trait::async_trait;

use crate::domain::foundation::{
    DomainError, LedgerEntryId, Money, ReferralAccountId, SaleReference, Timestamp,
};
use crate::domain::ledger::{CommissionLedgerEntry, RetryDisposition};

/// Outcome of inserting a ledger entry.
#[derive(Debug, Clone)]
pub enum InsertEntryOutcome {
    /// The entry was stored.
    Inserted,

    /// An entry with this sale reference already exists; returned unchanged.
    DuplicateSaleReference(CommissionLedgerEntry),
}

/// Per-account rollup of ledger totals, for the dashboard read side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommissionSummary {
    /// Entries ever recorded for the account.
    pub total_entries: u64,

    /// Commission across all non-failed entries.
    pub total_earned: Money,

    /// Commission already paid out.
    pub total_settled: Money,

    /// Commission still pending or scheduled.
    pub outstanding: Money,

    /// Commission parked in failed entries.
    pub failed: Money,
}

/// Repository port for commission ledger persistence.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Insert a new entry, enforcing sale-reference uniqueness.
    async fn insert(&self, entry: &CommissionLedgerEntry)
        -> Result<InsertEntryOutcome, DomainError>;

    /// Look up an entry by its sale reference.
    async fn find_by_sale_reference(
        &self,
        reference: &SaleReference,
    ) -> Result<Option<CommissionLedgerEntry>, DomainError>;

    /// Look up an entry by id.
    async fn find_by_id(
        &self,
        id: &LedgerEntryId,
    ) -> Result<Option<CommissionLedgerEntry>, DomainError>;

    /// Reserve everything ready for settlement.
    ///
    /// Atomically transitions Pending entries with `created_at <= cutoff`
    /// to Scheduled and returns all Scheduled entries, including ones left
    /// over from an interrupted cycle. Each entry is claimed exactly once
    /// across concurrent callers.
    async fn claim_due(&self, cutoff: Timestamp)
        -> Result<Vec<CommissionLedgerEntry>, DomainError>;

    /// Commit a confirmed payout: every listed entry becomes Settled with
    /// the given transfer reference and timestamp, as one unit.
    async fn mark_settled(
        &self,
        ids: &[LedgerEntryId],
        transfer_id: &str,
        settled_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Record a confirmed payout failure for a group: each entry's retry
    /// counter is bumped and it is either requeued to Pending or parked in
    /// Failed once the budget is spent.
    async fn release_for_retry(
        &self,
        ids: &[LedgerEntryId],
        max_retries: u32,
    ) -> Result<Vec<(LedgerEntryId, RetryDisposition)>, DomainError>;

    /// Roll up the account's ledger totals.
    async fn account_summary(
        &self,
        account_id: &ReferralAccountId,
    ) -> Result<CommissionSummary, DomainError>;
}
