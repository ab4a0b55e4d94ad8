//! In-memory account repository for testing and development.
//!
//! Mirrors the Postgres adapter's semantics: owner/code uniqueness, the
//! per-account critical section, and processed-sale-reference idempotency.
//! The whole store sits behind one async RwLock, so qualifying-sale
//! updates are serialized exactly as a row lock would serialize them.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{
    CommissionRate, DomainError, Money, OwnerId, ReferralAccountId, SaleReference,
};
use crate::domain::registry::{ReferralAccount, ReferralCode};
use crate::domain::tiers::TierSchedule;
use crate::ports::{AccountRepository, InsertAccountOutcome, QualifyingSaleOutcome};

/// In-memory implementation of the AccountRepository port.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, ReferralAccount>,
    processed_sales: HashSet<(Uuid, String)>,
}

impl InMemoryAccountRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    /// True when no accounts are stored.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.accounts.is_empty()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn insert(
        &self,
        account: &ReferralAccount,
    ) -> Result<InsertAccountOutcome, DomainError> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .accounts
            .values()
            .find(|a| a.owner_id == account.owner_id)
        {
            return Ok(InsertAccountOutcome::DuplicateOwner(existing.clone()));
        }
        if state
            .accounts
            .values()
            .any(|a| a.referral_code == account.referral_code)
        {
            return Ok(InsertAccountOutcome::DuplicateCode);
        }

        state
            .accounts
            .insert(*account.id.as_uuid(), account.clone());
        Ok(InsertAccountOutcome::Inserted)
    }

    async fn find_by_owner(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| &a.owner_id == owner_id)
            .cloned())
    }

    async fn find_by_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| &a.referral_code == code)
            .cloned())
    }

    async fn find_by_id(
        &self,
        id: &ReferralAccountId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let state = self.state.read().await;
        Ok(state.accounts.get(id.as_uuid()).cloned())
    }

    async fn current_rate(
        &self,
        id: &ReferralAccountId,
    ) -> Result<Option<CommissionRate>, DomainError> {
        let state = self.state.read().await;
        Ok(state.accounts.get(id.as_uuid()).map(|a| a.current_rate))
    }

    async fn apply_qualifying_sale(
        &self,
        id: &ReferralAccountId,
        sale_reference: &SaleReference,
        amount: Money,
        schedule: &TierSchedule,
    ) -> Result<QualifyingSaleOutcome, DomainError> {
        // One write lock spans the dedup check, the counter update and the
        // tier recompute, giving the same atomicity as a row lock.
        let mut state = self.state.write().await;

        let dedup_key = (*id.as_uuid(), sale_reference.as_str().to_string());
        if state.processed_sales.contains(&dedup_key) {
            return Ok(QualifyingSaleOutcome::AlreadyCounted);
        }

        let account = match state.accounts.get_mut(id.as_uuid()) {
            Some(account) => account,
            None => return Ok(QualifyingSaleOutcome::AccountNotFound),
        };

        let upgrade = account.apply_qualifying_sale(amount, schedule)?;
        let account = account.clone();
        state.processed_sales.insert(dedup_key);

        Ok(QualifyingSaleOutcome::Applied { account, upgrade })
    }

    async fn deactivate(&self, id: &ReferralAccountId) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if let Some(account) = state.accounts.get_mut(id.as_uuid()) {
            account.deactivate();
        }
        Ok(())
    }
}
