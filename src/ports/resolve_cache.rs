//! Resolve cache port - short-TTL referral code lookups.
//!
//! Referral codes are immutable once issued, so the code -> account-id
//! mapping is safe to cache briefly for the high-frequency visit path.
//! Only the mapping is cached: rates and tiers are never served from here,
//! so a stale rate can never reach the commission ledger.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ReferralAccountId};
use crate::domain::registry::ReferralCode;

/// Cache port for resolve lookups.
#[async_trait]
pub trait ResolveCache: Send + Sync {
    /// Cached account id for a code, if present and unexpired.
    async fn get(&self, code: &ReferralCode) -> Result<Option<ReferralAccountId>, DomainError>;

    /// Store a mapping with the given time-to-live.
    async fn put(
        &self,
        code: &ReferralCode,
        account_id: ReferralAccountId,
        ttl: Duration,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_cache_is_object_safe() {
        fn _accepts_dyn(_cache: &dyn ResolveCache) {}
    }
}
