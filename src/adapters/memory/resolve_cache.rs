//! In-memory resolve cache for testing and single-server deployments.
//!
//! TTL map from referral code to account id. Expired slots are dropped
//! lazily on read.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ReferralAccountId};
use crate::domain::registry::ReferralCode;
use crate::ports::ResolveCache;

/// In-memory implementation of the ResolveCache port.
#[derive(Default)]
pub struct InMemoryResolveCache {
    slots: RwLock<HashMap<String, CachedSlot>>,
}

struct CachedSlot {
    account_id: ReferralAccountId,
    expires_at: Instant,
}

impl InMemoryResolveCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResolveCache for InMemoryResolveCache {
    async fn get(&self, code: &ReferralCode) -> Result<Option<ReferralAccountId>, DomainError> {
        let now = Instant::now();
        {
            let slots = self.slots.read().await;
            match slots.get(code.as_str()) {
                Some(slot) if slot.expires_at > now => return Ok(Some(slot.account_id)),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop the slot.
        self.slots.write().await.remove(code.as_str());
        Ok(None)
    }

    async fn put(
        &self,
        code: &ReferralCode,
        account_id: ReferralAccountId,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        self.slots.write().await.insert(
            code.as_str().to_string(),
            CachedSlot {
                account_id,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_mapping() {
        let cache = InMemoryResolveCache::new();
        let code = ReferralCode::generate();
        let account_id = ReferralAccountId::new();

        cache
            .put(&code, account_id, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&code).await.unwrap(), Some(account_id));
    }

    #[tokio::test]
    async fn expired_slot_is_a_miss() {
        let cache = InMemoryResolveCache::new();
        let code = ReferralCode::generate();

        cache
            .put(&code, ReferralAccountId::new(), Duration::from_millis(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(&code).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_code_is_a_miss() {
        let cache = InMemoryResolveCache::new();
        assert_eq!(cache.get(&ReferralCode::generate()).await.unwrap(), None);
    }
}
