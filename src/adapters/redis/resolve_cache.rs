//! Redis-backed resolve cache for multi-server deployments.
//!
//! SET-with-expiry over the code -> account-id mapping. Only the mapping
//! lives here; rates are always read from the store of record.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, ReferralAccountId};
use crate::domain::registry::ReferralCode;
use crate::ports::ResolveCache;

/// Key prefix separating resolve slots from other Redis users.
const KEY_PREFIX: &str = "resolve:";

/// Redis implementation of the ResolveCache port.
#[derive(Clone)]
pub struct RedisResolveCache {
    conn: MultiplexedConnection,
}

impl RedisResolveCache {
    /// Creates a cache over an established connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    fn key(code: &ReferralCode) -> String {
        format!("{}{}", KEY_PREFIX, code.as_str())
    }
}

fn cache_error(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("{}: {}", context, e))
}

#[async_trait]
impl ResolveCache for RedisResolveCache {
    async fn get(&self, code: &ReferralCode) -> Result<Option<ReferralAccountId>, DomainError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(Self::key(code))
            .await
            .map_err(|e| cache_error("Failed to read resolve slot", e))?;

        match value {
            Some(raw) => ReferralAccountId::from_str(&raw)
                .map(Some)
                .map_err(|e| cache_error("Corrupt resolve slot", e)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        code: &ReferralCode,
        account_id: ReferralAccountId,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(
            Self::key(code),
            account_id.to_string(),
            ttl.as_secs().max(1),
        )
        .await
        .map_err(|e| cache_error("Failed to write resolve slot", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_with_namespace() {
        let code = ReferralCode::parse("REF-ABC123").unwrap();
        assert_eq!(RedisResolveCache::key(&code), "resolve:REF-ABC123");
    }
}
