//! Settlement lock port - single-flight guard for the batch job.
//!
//! Two overlapping settlement cycles must never run; the lock is keyed by
//! a fixed job name so every deployment instance contends for the same
//! lease (Postgres advisory lock in production, a mutex in memory).

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for the settlement cycle's advisory lock.
#[async_trait]
pub trait SettlementLock: Send + Sync {
    /// Try to acquire the lease for a job name.
    ///
    /// Returns false without blocking when another cycle holds it.
    async fn try_acquire(&self, job_name: &str) -> Result<bool, DomainError>;

    /// Release a previously acquired lease.
    ///
    /// Releasing a lease that is not held is a no-op.
    async fn release(&self, job_name: &str) -> Result<(), DomainError>;
}
