//! In-memory ledger repository for testing and development.
//!
//! Mirrors the Postgres adapter's semantics: sale-reference uniqueness,
//! per-entry claim atomicity, and group-level settlement commits. One
//! async RwLock guards the whole store, so a `claim_due` call observes and
//! transitions entries atomically with respect to concurrent cycles.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, LedgerEntryId, Money, ReferralAccountId, SaleReference, Timestamp,
};
use crate::domain::ledger::{CommissionLedgerEntry, EntryState, RetryDisposition};
use crate::ports::{CommissionSummary, InsertEntryOutcome, LedgerRepository};

/// In-memory implementation of the LedgerRepository port.
#[derive(Default)]
pub struct InMemoryLedgerRepository {
    entries: RwLock<HashMap<Uuid, CommissionLedgerEntry>>,
}

impl InMemoryLedgerRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, for test assertions.
    pub async fn all(&self) -> Vec<CommissionLedgerEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn insert(
        &self,
        entry: &CommissionLedgerEntry,
    ) -> Result<InsertEntryOutcome, DomainError> {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries
            .values()
            .find(|e| e.sale_reference == entry.sale_reference)
        {
            return Ok(InsertEntryOutcome::DuplicateSaleReference(existing.clone()));
        }

        entries.insert(*entry.id.as_uuid(), entry.clone());
        Ok(InsertEntryOutcome::Inserted)
    }

    async fn find_by_sale_reference(
        &self,
        reference: &SaleReference,
    ) -> Result<Option<CommissionLedgerEntry>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|e| &e.sale_reference == reference)
            .cloned())
    }

    async fn find_by_id(
        &self,
        id: &LedgerEntryId,
    ) -> Result<Option<CommissionLedgerEntry>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries.get(id.as_uuid()).cloned())
    }

    async fn claim_due(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<CommissionLedgerEntry>, DomainError> {
        let mut entries = self.entries.write().await;

        let mut claimed = Vec::new();
        for entry in entries.values_mut() {
            if entry.is_due(cutoff) {
                entry
                    .schedule()
                    .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
            }
            if entry.state == EntryState::Scheduled {
                claimed.push(entry.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_settled(
        &self,
        ids: &[LedgerEntryId],
        transfer_id: &str,
        settled_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;

        for id in ids {
            let entry = entries.get_mut(id.as_uuid()).ok_or_else(|| {
                DomainError::new(ErrorCode::EntryNotFound, format!("entry {} not found", id))
            })?;
            entry
                .settle(transfer_id, settled_at)
                .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        }
        Ok(())
    }

    async fn release_for_retry(
        &self,
        ids: &[LedgerEntryId],
        max_retries: u32,
    ) -> Result<Vec<(LedgerEntryId, RetryDisposition)>, DomainError> {
        let mut entries = self.entries.write().await;

        let mut dispositions = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = entries.get_mut(id.as_uuid()).ok_or_else(|| {
                DomainError::new(ErrorCode::EntryNotFound, format!("entry {} not found", id))
            })?;
            let disposition = entry
                .release_for_retry(max_retries)
                .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
            dispositions.push((*id, disposition));
        }
        Ok(dispositions)
    }

    async fn account_summary(
        &self,
        account_id: &ReferralAccountId,
    ) -> Result<CommissionSummary, DomainError> {
        let entries = self.entries.read().await;

        let mut summary = CommissionSummary::default();
        for entry in entries.values().filter(|e| &e.account_id == account_id) {
            summary.total_entries += 1;
            let add = |acc: Money, amount: Money| {
                acc.checked_add(amount).ok_or_else(|| {
                    DomainError::new(ErrorCode::InvariantViolation, "summary overflow")
                })
            };
            match entry.state {
                EntryState::Settled => {
                    summary.total_settled = add(summary.total_settled, entry.commission_amount)?;
                    summary.total_earned = add(summary.total_earned, entry.commission_amount)?;
                }
                EntryState::Pending | EntryState::Scheduled => {
                    summary.outstanding = add(summary.outstanding, entry.commission_amount)?;
                    summary.total_earned = add(summary.total_earned, entry.commission_amount)?;
                }
                EntryState::Failed => {
                    summary.failed = add(summary.failed, entry.commission_amount)?;
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::CommissionRate;

    fn entry_for(account_id: ReferralAccountId, reference: &str, minor: i64) -> CommissionLedgerEntry {
        CommissionLedgerEntry::record(
            account_id,
            SaleReference::new(reference).unwrap(),
            Money::from_minor_units(minor).unwrap(),
            CommissionRate::parse("0.15").unwrap(),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_sale_reference_returns_existing_entry() {
        let repo = InMemoryLedgerRepository::new();
        let account_id = ReferralAccountId::new();
        let entry = entry_for(account_id, "pi_1", 10_000);
        repo.insert(&entry).await.unwrap();

        let duplicate = entry_for(account_id, "pi_1", 99_999);
        let outcome = repo.insert(&duplicate).await.unwrap();
        match outcome {
            InsertEntryOutcome::DuplicateSaleReference(existing) => {
                assert_eq!(existing.id, entry.id);
                assert_eq!(existing.sale_amount, entry.sale_amount);
            }
            InsertEntryOutcome::Inserted => panic!("expected duplicate"),
        }
        assert_eq!(repo.all().await.len(), 1);
    }

    #[tokio::test]
    async fn claim_due_respects_cutoff() {
        let repo = InMemoryLedgerRepository::new();
        let entry = entry_for(ReferralAccountId::new(), "pi_1", 10_000);
        repo.insert(&entry).await.unwrap();

        // Cutoff before creation: nothing is due yet.
        let claimed = repo.claim_due(entry.created_at.minus_secs(60)).await.unwrap();
        assert!(claimed.is_empty());

        // Cutoff after creation: the entry is claimed and scheduled.
        let claimed = repo.claim_due(entry.created_at.plus_secs(1)).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].state, EntryState::Scheduled);
    }

    #[tokio::test]
    async fn claim_due_resumes_interrupted_batches() {
        let repo = InMemoryLedgerRepository::new();
        let entry = entry_for(ReferralAccountId::new(), "pi_1", 10_000);
        repo.insert(&entry).await.unwrap();

        let cutoff = entry.created_at.plus_secs(1);
        let first = repo.claim_due(cutoff).await.unwrap();
        assert_eq!(first.len(), 1);

        // A second cycle sees the still-Scheduled entry again; it is never
        // double-transitioned, just re-collected.
        let second = repo.claim_due(cutoff).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, entry.id);
    }

    #[tokio::test]
    async fn mark_settled_commits_the_whole_group() {
        let repo = InMemoryLedgerRepository::new();
        let account_id = ReferralAccountId::new();
        let e1 = entry_for(account_id, "pi_1", 10_000);
        let e2 = entry_for(account_id, "pi_2", 20_000);
        repo.insert(&e1).await.unwrap();
        repo.insert(&e2).await.unwrap();
        repo.claim_due(Timestamp::now().plus_secs(1)).await.unwrap();

        let settled_at = Timestamp::now();
        repo.mark_settled(&[e1.id, e2.id], "tr_1", settled_at)
            .await
            .unwrap();

        for entry in repo.all().await {
            assert_eq!(entry.state, EntryState::Settled);
            assert_eq!(entry.transfer_id.as_deref(), Some("tr_1"));
            assert_eq!(entry.settled_at, Some(settled_at));
        }
    }

    #[tokio::test]
    async fn release_for_retry_exhausts_budget() {
        let repo = InMemoryLedgerRepository::new();
        let entry = entry_for(ReferralAccountId::new(), "pi_1", 10_000);
        repo.insert(&entry).await.unwrap();
        let cutoff = Timestamp::now().plus_secs(1);

        repo.claim_due(cutoff).await.unwrap();
        let first = repo.release_for_retry(&[entry.id], 2).await.unwrap();
        assert_eq!(first[0].1, RetryDisposition::Requeued);

        repo.claim_due(cutoff).await.unwrap();
        let second = repo.release_for_retry(&[entry.id], 2).await.unwrap();
        assert_eq!(second[0].1, RetryDisposition::Exhausted);

        let stored = repo.find_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.state, EntryState::Failed);
    }

    #[tokio::test]
    async fn summary_buckets_states() {
        let repo = InMemoryLedgerRepository::new();
        let account_id = ReferralAccountId::new();
        let settled = entry_for(account_id, "pi_1", 100_000);
        let pending = entry_for(account_id, "pi_2", 100_000);
        repo.insert(&settled).await.unwrap();
        repo.insert(&pending).await.unwrap();

        repo.claim_due(Timestamp::now().plus_secs(1)).await.unwrap();
        repo.mark_settled(&[settled.id], "tr_1", Timestamp::now())
            .await
            .unwrap();
        // Put the other entry back to outstanding.
        repo.release_for_retry(&[pending.id], 5).await.unwrap();

        let summary = repo.account_summary(&account_id).await.unwrap();
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.total_settled.minor_units(), 15_000);
        assert_eq!(summary.outstanding.minor_units(), 15_000);
        assert_eq!(summary.total_earned.minor_units(), 30_000);
        assert_eq!(summary.failed, Money::ZERO);
    }
}
