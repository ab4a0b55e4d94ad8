//! Payout batches - per-referrer grouping of scheduled entries.
//!
//! A batch aggregates one referrer's scheduled entries into a single
//! payout request. The batch idempotency key is derived from the sorted
//! set of entry ids, so resubmitting the same batch after a crash hits the
//! rail's duplicate detection instead of moving money twice.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::{LedgerEntryId, Money, ReferralAccountId};

use super::CommissionLedgerEntry;

/// Deterministic identifier for one logical payout submission.
///
/// Derived from the sorted entry ids plus each entry's retry count. A
/// crash-replay of the same attempt reproduces the key exactly (so the
/// rail collapses it), while a post-failure retry has bumped counters and
/// therefore a fresh key, since rails cache failed outcomes per key too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derives the key for a set of entry attempts.
    ///
    /// Order-insensitive: pairs are sorted by entry id before hashing.
    pub fn for_attempts(attempts: &[(LedgerEntryId, u32)]) -> Self {
        let mut sorted: Vec<&(LedgerEntryId, u32)> = attempts.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        for (id, retry_count) in sorted {
            hasher.update(id.as_uuid().as_bytes());
            hasher.update(retry_count.to_be_bytes());
        }
        Self(format!("payout-{}", hex::encode(hasher.finalize())))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One referrer's scheduled entries, settled as a unit.
#[derive(Debug, Clone)]
pub struct PayoutBatch {
    /// Referrer receiving the aggregate payout.
    pub account_id: ReferralAccountId,

    /// Entries covered by this batch.
    pub entries: Vec<CommissionLedgerEntry>,
}

impl PayoutBatch {
    /// Groups entries by account, one batch per referrer.
    ///
    /// Output order is deterministic (by account uuid) so cycles behave
    /// reproducibly under test.
    pub fn group_by_account(entries: Vec<CommissionLedgerEntry>) -> Vec<PayoutBatch> {
        let mut groups: BTreeMap<uuid::Uuid, PayoutBatch> = BTreeMap::new();
        for entry in entries {
            groups
                .entry(*entry.account_id.as_uuid())
                .or_insert_with(|| PayoutBatch {
                    account_id: entry.account_id,
                    entries: Vec::new(),
                })
                .entries
                .push(entry);
        }
        groups.into_values().collect()
    }

    /// Sum of the batch's commission amounts; None on overflow.
    pub fn total(&self) -> Option<Money> {
        Money::total(self.entries.iter().map(|e| e.commission_amount))
    }

    /// Ids of the covered entries, sorted.
    pub fn entry_ids(&self) -> Vec<LedgerEntryId> {
        let mut ids: Vec<LedgerEntryId> = self.entries.iter().map(|e| e.id).collect();
        ids.sort();
        ids
    }

    /// The batch's idempotency key for the current attempt.
    pub fn idempotency_key(&self) -> IdempotencyKey {
        let attempts: Vec<(LedgerEntryId, u32)> =
            self.entries.iter().map(|e| (e.id, e.retry_count)).collect();
        IdempotencyKey::for_attempts(&attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CommissionRate, SaleReference, Timestamp};

    fn entry_for(account_id: ReferralAccountId, reference: &str, minor: i64) -> CommissionLedgerEntry {
        CommissionLedgerEntry::record(
            account_id,
            SaleReference::new(reference).unwrap(),
            Money::from_minor_units(minor).unwrap(),
            CommissionRate::parse("0.20").unwrap(),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn grouping_splits_by_account() {
        let a = ReferralAccountId::new();
        let b = ReferralAccountId::new();
        let batches = PayoutBatch::group_by_account(vec![
            entry_for(a, "s-1", 10_000),
            entry_for(b, "s-2", 20_000),
            entry_for(a, "s-3", 30_000),
        ]);

        assert_eq!(batches.len(), 2);
        let batch_a = batches.iter().find(|g| g.account_id == a).unwrap();
        assert_eq!(batch_a.entries.len(), 2);
        let batch_b = batches.iter().find(|g| g.account_id == b).unwrap();
        assert_eq!(batch_b.entries.len(), 1);
    }

    #[test]
    fn total_sums_commissions() {
        let a = ReferralAccountId::new();
        let batches = PayoutBatch::group_by_account(vec![
            entry_for(a, "s-1", 10_000),
            entry_for(a, "s-2", 30_000),
        ]);
        // 20% of 100.00 plus 20% of 300.00 is 80.00.
        assert_eq!(batches[0].total().unwrap().minor_units(), 8_000);
    }

    #[test]
    fn idempotency_key_ignores_entry_order() {
        let a = ReferralAccountId::new();
        let e1 = entry_for(a, "s-1", 10_000);
        let e2 = entry_for(a, "s-2", 20_000);

        let key_fwd = IdempotencyKey::for_attempts(&[(e1.id, 0), (e2.id, 0)]);
        let key_rev = IdempotencyKey::for_attempts(&[(e2.id, 0), (e1.id, 0)]);
        assert_eq!(key_fwd, key_rev);
    }

    #[test]
    fn idempotency_key_differs_for_different_sets() {
        let a = ReferralAccountId::new();
        let e1 = entry_for(a, "s-1", 10_000);
        let e2 = entry_for(a, "s-2", 20_000);

        let key_one = IdempotencyKey::for_attempts(&[(e1.id, 0)]);
        let key_both = IdempotencyKey::for_attempts(&[(e1.id, 0), (e2.id, 0)]);
        assert_ne!(key_one, key_both);
    }

    #[test]
    fn idempotency_key_changes_after_a_retry() {
        let id = LedgerEntryId::new();
        let first_attempt = IdempotencyKey::for_attempts(&[(id, 0)]);
        let second_attempt = IdempotencyKey::for_attempts(&[(id, 1)]);
        assert_ne!(first_attempt, second_attempt);
    }

    #[test]
    fn idempotency_key_is_stable_for_replayed_attempt() {
        let id = LedgerEntryId::new();
        assert_eq!(
            IdempotencyKey::for_attempts(&[(id, 2)]),
            IdempotencyKey::for_attempts(&[(id, 2)])
        );
    }

    #[test]
    fn idempotency_key_has_payout_prefix() {
        let key = IdempotencyKey::for_attempts(&[(LedgerEntryId::new(), 0)]);
        assert!(key.as_str().starts_with("payout-"));
    }
}
