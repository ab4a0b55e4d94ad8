//! In-memory settlement lock for testing and single-server deployments.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::SettlementLock;

/// In-memory implementation of the SettlementLock port.
#[derive(Default)]
pub struct InMemorySettlementLock {
    held: Mutex<HashSet<String>>,
}

impl InMemorySettlementLock {
    /// Creates a lock with no leases held.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettlementLock for InMemorySettlementLock {
    async fn try_acquire(&self, job_name: &str) -> Result<bool, DomainError> {
        Ok(self.held.lock().await.insert(job_name.to_string()))
    }

    async fn release(&self, job_name: &str) -> Result<(), DomainError> {
        self.held.lock().await.remove(job_name);
        Ok(())
    }
}
