//! Account repository port (referral registry storage).
//!
//! Defines the contract for persisting referral accounts and for the two
//! operations with hard concurrency requirements: unique issuance and the
//! atomic qualifying-sale update.
//!
//! # Design
//!
//! - **Uniqueness at the store**: one active code per owner and global code
//!   uniqueness are enforced by constraints, surfaced as typed outcomes
//!   rather than raw database errors.
//! - **Atomic tier math**: `apply_qualifying_sale` performs the counter
//!   increment and tier recomputation inside one per-account critical
//!   section (row lock, mutex), and is idempotent per sale reference.
//! - **Fresh rates**: `current_rate` always reads the store; implementations
//!   must never serve it from a cache.

use async_trait::async_trait;

use crate::domain::foundation::{
    CommissionRate, DomainError, Money, OwnerId, ReferralAccountId, SaleReference,
};
use crate::domain::registry::{ReferralAccount, ReferralCode};
use crate::domain::tiers::{TierSchedule, TierUpgrade};

/// Outcome of inserting a new account.
#[derive(Debug, Clone)]
pub enum InsertAccountOutcome {
    /// The account was stored.
    Inserted,

    /// The owner already has an account; the existing one is returned.
    DuplicateOwner(ReferralAccount),

    /// The generated code collided with an existing one; caller should
    /// regenerate and retry.
    DuplicateCode,
}

/// Outcome of counting a qualifying sale.
#[derive(Debug, Clone)]
pub enum QualifyingSaleOutcome {
    /// The sale was counted; the updated account and any promotion.
    Applied {
        account: ReferralAccount,
        upgrade: Option<TierUpgrade>,
    },

    /// This sale reference was already counted; nothing changed.
    AlreadyCounted,

    /// No account with that id.
    AccountNotFound,
}

/// Repository port for referral account persistence.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account, enforcing owner and code uniqueness.
    async fn insert(&self, account: &ReferralAccount)
        -> Result<InsertAccountOutcome, DomainError>;

    /// Look up an account by its owner.
    async fn find_by_owner(&self, owner_id: &OwnerId)
        -> Result<Option<ReferralAccount>, DomainError>;

    /// Look up an account by referral code. Read-only; safe at visit
    /// frequency.
    async fn find_by_code(&self, code: &ReferralCode)
        -> Result<Option<ReferralAccount>, DomainError>;

    /// Look up an account by id.
    async fn find_by_id(
        &self,
        id: &ReferralAccountId,
    ) -> Result<Option<ReferralAccount>, DomainError>;

    /// The account's present commission rate, read fresh from the store.
    async fn current_rate(
        &self,
        id: &ReferralAccountId,
    ) -> Result<Option<CommissionRate>, DomainError>;

    /// Count a qualifying sale: increment the lifetime accumulator and
    /// recompute the tier atomically for this account.
    ///
    /// Must be idempotent per `sale_reference` and must serialize against
    /// concurrent calls for the same account; lost counter updates are not
    /// acceptable.
    async fn apply_qualifying_sale(
        &self,
        id: &ReferralAccountId,
        sale_reference: &SaleReference,
        amount: Money,
        schedule: &TierSchedule,
    ) -> Result<QualifyingSaleOutcome, DomainError>;

    /// Deactivate the account. Idempotent; the row is never deleted.
    async fn deactivate(&self, id: &ReferralAccountId) -> Result<(), DomainError>;
}
