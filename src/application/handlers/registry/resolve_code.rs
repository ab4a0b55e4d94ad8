//! ResolveCodeHandler - Read-side lookup of referral codes.
//!
//! The hot path: attribution hits this on every tracked visit. The
//! code -> account-id mapping is cached with a short TTL (codes are
//! immutable once issued); the account row itself is always read from the
//! store, so tier and rate are never stale.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::registry::{ReferralAccount, ReferralCode, RegistryError};
use crate::ports::{AccountRepository, ResolveCache};

/// Handler for resolving referral codes. Never mutates state.
pub struct ResolveCodeHandler {
    accounts: Arc<dyn AccountRepository>,
    cache: Arc<dyn ResolveCache>,
    cache_ttl: Duration,
}

impl ResolveCodeHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        cache: Arc<dyn ResolveCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            accounts,
            cache,
            cache_ttl,
        }
    }

    pub async fn handle(&self, code: &ReferralCode) -> Result<ReferralAccount, RegistryError> {
        // Cache errors degrade to a store read; they never fail a resolve.
        match self.cache.get(code).await {
            Ok(Some(account_id)) => {
                if let Some(account) = self.accounts.find_by_id(&account_id).await? {
                    return Ok(account);
                }
                // Stale mapping; fall through to the store.
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "resolve cache read failed");
            }
        }

        let account = self
            .accounts
            .find_by_code(code)
            .await?
            .ok_or_else(|| RegistryError::unknown_referral(code.as_str()))?;

        if let Err(e) = self.cache.put(code, account.id, self.cache_ttl).await {
            tracing::warn!(error = %e, "resolve cache write failed");
        }

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountRepository, InMemoryResolveCache};
    use crate::domain::foundation::{OwnerId, ReferralAccountId};
    use crate::domain::tiers::TierSchedule;

    fn seeded() -> (
        ResolveCodeHandler,
        Arc<InMemoryAccountRepository>,
        Arc<InMemoryResolveCache>,
        ReferralAccount,
    ) {
        let repo = Arc::new(InMemoryAccountRepository::new());
        let cache = Arc::new(InMemoryResolveCache::new());
        let handler = ResolveCodeHandler::new(repo.clone(), cache.clone(), Duration::from_secs(60));
        let account = ReferralAccount::create(
            ReferralAccountId::new(),
            OwnerId::new("owner-1").unwrap(),
            ReferralCode::generate(),
            &TierSchedule::default(),
        );
        (handler, repo, cache, account)
    }

    #[tokio::test]
    async fn resolves_known_code() {
        let (handler, repo, _, account) = seeded();
        repo.insert(&account).await.unwrap();

        let resolved = handler.handle(&account.referral_code).await.unwrap();
        assert_eq!(resolved.id, account.id);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let (handler, _, _, _) = seeded();
        let err = handler.handle(&ReferralCode::generate()).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownReferral(_)));
    }

    #[tokio::test]
    async fn resolve_populates_the_cache() {
        let (handler, repo, cache, account) = seeded();
        repo.insert(&account).await.unwrap();

        handler.handle(&account.referral_code).await.unwrap();
        let cached = cache.get(&account.referral_code).await.unwrap();
        assert_eq!(cached, Some(account.id));
    }

    #[tokio::test]
    async fn cached_resolve_still_reads_fresh_account_row() {
        let (handler, repo, _, account) = seeded();
        repo.insert(&account).await.unwrap();

        // Prime the cache.
        handler.handle(&account.referral_code).await.unwrap();

        // Deactivate after caching; the resolve must observe it.
        repo.deactivate(&account.id).await.unwrap();
        let resolved = handler.handle(&account.referral_code).await.unwrap();
        assert!(!resolved.is_active());
    }
}
