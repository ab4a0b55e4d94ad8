//! Attribution store port - append-only visit analytics.

use async_trait::async_trait;

use crate::domain::attribution::AttributionRecord;
use crate::domain::foundation::{DomainError, ReferralAccountId};

/// Store port for attribution records.
///
/// Append-only; records are never mutated. Failures here are analytics
/// losses, never commission losses.
#[async_trait]
pub trait AttributionStore: Send + Sync {
    /// Append one tracked visit.
    async fn append(&self, record: &AttributionRecord) -> Result<(), DomainError>;

    /// Most recent visits for an account, newest first.
    async fn recent_for_account(
        &self,
        account_id: &ReferralAccountId,
        limit: u32,
    ) -> Result<Vec<AttributionRecord>, DomainError>;
}
