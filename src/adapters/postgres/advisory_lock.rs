//! PostgreSQL advisory lock implementation of SettlementLock.
//!
//! Advisory locks are session-scoped, so the connection that acquired a
//! lease must also release it. The adapter parks that connection in a
//! slot for the lease's lifetime; dropping it early would silently drop
//! the lock with it.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::SettlementLock;

/// PostgreSQL implementation of the SettlementLock port.
pub struct PostgresSettlementLock {
    pool: PgPool,
    held: Mutex<HashMap<String, PoolConnection<Postgres>>>,
}

impl PostgresSettlementLock {
    /// Creates a new lock backed by the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            held: Mutex::new(HashMap::new()),
        }
    }
}

/// Stable 64-bit key for `pg_try_advisory_lock`.
fn lock_key(job_name: &str) -> i64 {
    let digest = Sha256::digest(job_name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

fn db_error(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl SettlementLock for PostgresSettlementLock {
    async fn try_acquire(&self, job_name: &str) -> Result<bool, DomainError> {
        let mut held = self.held.lock().await;
        if held.contains_key(job_name) {
            return Ok(false);
        }

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))?;

        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(lock_key(job_name))
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to take advisory lock", e))?;

        if acquired {
            held.insert(job_name.to_string(), conn);
        }
        Ok(acquired)
    }

    async fn release(&self, job_name: &str) -> Result<(), DomainError> {
        let mut held = self.held.lock().await;
        let mut conn = match held.remove(job_name) {
            Some(conn) => conn,
            None => return Ok(()),
        };

        sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
            .bind(lock_key(job_name))
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to release advisory lock", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_stable_per_job_name() {
        assert_eq!(lock_key("commission-settlement"), lock_key("commission-settlement"));
        assert_ne!(lock_key("commission-settlement"), lock_key("other-job"));
    }
}
