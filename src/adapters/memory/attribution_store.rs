//! In-memory attribution store for testing and development.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::attribution::AttributionRecord;
use crate::domain::foundation::{DomainError, ReferralAccountId};
use crate::ports::AttributionStore;

/// In-memory implementation of the AttributionStore port.
#[derive(Default)]
pub struct InMemoryAttributionStore {
    records: RwLock<Vec<AttributionRecord>>,
}

impl InMemoryAttributionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl AttributionStore for InMemoryAttributionStore {
    async fn append(&self, record: &AttributionRecord) -> Result<(), DomainError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn recent_for_account(
        &self,
        account_id: &ReferralAccountId,
        limit: u32,
    ) -> Result<Vec<AttributionRecord>, DomainError> {
        let records = self.records.read().await;
        let mut matching: Vec<AttributionRecord> = records
            .iter()
            .filter(|r| &r.account_id == account_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}
