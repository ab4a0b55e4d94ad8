//! RunSettlementCycleHandler - one pass of the payout batcher.
//!
//! Converts pending entries into settled money without double-paying and
//! without losing entries on partial failure:
//!
//! 1. Single-flight guard through the settlement lock.
//! 2. Claim everything due (`Pending` past the cool-down) plus leftovers
//!    from an interrupted batch.
//! 3. Group per referrer, one aggregate payout per group, keyed by the
//!    sorted entry-id digest.
//! 4. Timeout means unknown outcome: reconcile by idempotency key, never
//!    blind-resubmit.
//! 5. Confirmed success commits the whole group; confirmed failure spends
//!    one retry; one group's outcome never touches another's.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{DomainError, Money, Timestamp};
use crate::domain::ledger::{PayoutBatch, RetryDisposition};
use crate::ports::{
    AccountRepository, LedgerRepository, PaymentRail, PayoutOutcome, PayoutRequest, SettlementLock,
};

/// Fixed job name every instance contends on.
const SETTLEMENT_JOB: &str = "commission-settlement";

/// Tunables for the settlement cycle, all supplied by configuration.
#[derive(Debug, Clone)]
pub struct SettlementPolicy {
    /// Dispute/chargeback buffer: entries younger than this are not
    /// eligible.
    pub cool_down: Duration,

    /// Failed payout attempts before an entry parks in `Failed`.
    pub max_retries: u32,

    /// Deadline for one payment-rail call.
    pub rail_timeout: Duration,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            cool_down: Duration::from_secs(24 * 60 * 60),
            max_retries: 5,
            rail_timeout: Duration::from_secs(30),
        }
    }
}

/// Errors that abort a whole cycle (batch-level problems never do).
#[derive(Debug, Clone)]
pub enum SettlementError {
    /// Storage failure while claiming or committing.
    Infrastructure(String),
}

impl std::fmt::Display for SettlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementError::Infrastructure(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for SettlementError {}

impl From<DomainError> for SettlementError {
    fn from(err: DomainError) -> Self {
        SettlementError::Infrastructure(err.message)
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementReport {
    /// Entries claimed for this cycle (due plus resumed).
    pub entries_claimed: usize,

    /// Per-referrer batches formed.
    pub batches: usize,

    /// Batches confirmed and committed.
    pub batches_settled: usize,

    /// Batches with a confirmed failure.
    pub batches_failed: usize,

    /// Batches left scheduled for the next cycle (unknown or in-flight
    /// outcome).
    pub batches_deferred: usize,

    /// Entries settled this cycle.
    pub entries_settled: usize,

    /// Entries requeued to pending.
    pub entries_requeued: usize,

    /// Entries that exhausted their retry budget.
    pub entries_exhausted: usize,

    /// Commission amount settled this cycle.
    pub amount_settled: Money,
}

/// Outcome of asking for a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle holds the lease; nothing was done.
    SkippedLockHeld,

    /// The cycle ran.
    Completed(SettlementReport),
}

/// Handler running one settlement cycle.
pub struct RunSettlementCycleHandler {
    ledger: Arc<dyn LedgerRepository>,
    accounts: Arc<dyn AccountRepository>,
    rail: Arc<dyn PaymentRail>,
    lock: Arc<dyn SettlementLock>,
    policy: SettlementPolicy,
}

impl RunSettlementCycleHandler {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        accounts: Arc<dyn AccountRepository>,
        rail: Arc<dyn PaymentRail>,
        lock: Arc<dyn SettlementLock>,
        policy: SettlementPolicy,
    ) -> Self {
        Self {
            ledger,
            accounts,
            rail,
            lock,
            policy,
        }
    }

    /// Runs one cycle as of `now`.
    pub async fn handle(&self, now: Timestamp) -> Result<CycleOutcome, SettlementError> {
        if !self.lock.try_acquire(SETTLEMENT_JOB).await? {
            tracing::debug!("settlement lease held elsewhere, skipping cycle");
            return Ok(CycleOutcome::SkippedLockHeld);
        }

        let result = self.run_locked(now).await;

        if let Err(e) = self.lock.release(SETTLEMENT_JOB).await {
            tracing::warn!(error = %e, "failed to release settlement lease");
        }

        result.map(CycleOutcome::Completed)
    }

    async fn run_locked(&self, now: Timestamp) -> Result<SettlementReport, SettlementError> {
        let cutoff = now.minus_secs(self.policy.cool_down.as_secs());
        let claimed = self.ledger.claim_due(cutoff).await?;

        let mut report = SettlementReport {
            entries_claimed: claimed.len(),
            ..Default::default()
        };

        if claimed.is_empty() {
            tracing::debug!("no entries due for settlement");
            return Ok(report);
        }

        let batches = PayoutBatch::group_by_account(claimed);
        report.batches = batches.len();

        // Groups are independent referrers; settle them concurrently.
        // Group outcomes stay isolated: a batch-level error defers that
        // batch and the cycle moves on.
        let outcomes =
            futures::future::join_all(batches.iter().map(|batch| self.settle_batch(batch, now)))
                .await;

        for (batch, outcome) in batches.iter().zip(outcomes) {
            match outcome {
                Ok(BatchOutcome::Settled { entries, amount }) => {
                    report.batches_settled += 1;
                    report.entries_settled += entries;
                    report.amount_settled = report
                        .amount_settled
                        .checked_add(amount)
                        .unwrap_or(report.amount_settled);
                }
                Ok(BatchOutcome::Failed {
                    requeued,
                    exhausted,
                }) => {
                    report.batches_failed += 1;
                    report.entries_requeued += requeued;
                    report.entries_exhausted += exhausted;
                }
                Ok(BatchOutcome::Deferred) => {
                    report.batches_deferred += 1;
                }
                Err(e) => {
                    report.batches_deferred += 1;
                    tracing::warn!(
                        account_id = %batch.account_id,
                        error = %e,
                        "batch deferred after storage error"
                    );
                }
            }
        }

        tracing::info!(
            entries_claimed = report.entries_claimed,
            batches = report.batches,
            settled = report.batches_settled,
            failed = report.batches_failed,
            deferred = report.batches_deferred,
            amount_settled = %report.amount_settled,
            "settlement cycle complete"
        );

        Ok(report)
    }

    async fn settle_batch(
        &self,
        batch: &PayoutBatch,
        now: Timestamp,
    ) -> Result<BatchOutcome, DomainError> {
        let key = batch.idempotency_key();
        let entry_ids = batch.entry_ids();

        let amount = match batch.total() {
            Some(amount) => amount,
            None => {
                tracing::error!(account_id = %batch.account_id, "batch total overflowed");
                return Ok(BatchOutcome::Deferred);
            }
        };

        let destination = match self.accounts.find_by_id(&batch.account_id).await? {
            Some(account) => account.owner_id,
            None => {
                tracing::error!(account_id = %batch.account_id, "payout destination unknown");
                return Ok(BatchOutcome::Deferred);
            }
        };

        let request = PayoutRequest {
            idempotency_key: key.clone(),
            destination,
            amount,
        };

        let outcome = match tokio::time::timeout(
            self.policy.rail_timeout,
            self.rail.submit_payout(request),
        )
        .await
        {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(e)) if e.outcome_unknown() => {
                tracing::warn!(key = %key, error = %e, "payout outcome unknown, reconciling");
                None
            }
            Ok(Err(e)) => {
                // The request never took effect; a confirmed failure.
                tracing::warn!(key = %key, error = %e, "payout submission failed");
                Some(PayoutOutcome::Failed {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!(key = %key, "payout call exceeded deadline, reconciling");
                None
            }
        };

        // Unknown outcome: ask the rail what actually happened before
        // deciding anything.
        let outcome = match outcome {
            Some(outcome) => outcome,
            None => match self.rail.query_by_idempotency_key(&key).await {
                Ok(Some(prior)) => prior,
                Ok(None) => {
                    // Nothing reached the rail; the next cycle resubmits
                    // under the same key.
                    return Ok(BatchOutcome::Deferred);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "reconciliation query failed");
                    return Ok(BatchOutcome::Deferred);
                }
            },
        };

        match outcome {
            PayoutOutcome::Succeeded { transfer_id } => {
                // Confirmation and the local commit form one unit; a crash
                // in between is healed by the reconcile path above.
                self.ledger
                    .mark_settled(&entry_ids, &transfer_id, now)
                    .await?;
                tracing::info!(
                    account_id = %batch.account_id,
                    transfer_id = %transfer_id,
                    amount = %amount,
                    entries = entry_ids.len(),
                    "payout settled"
                );
                Ok(BatchOutcome::Settled {
                    entries: entry_ids.len(),
                    amount,
                })
            }
            PayoutOutcome::Accepted => {
                tracing::debug!(key = %key, "payout in flight, deferring");
                Ok(BatchOutcome::Deferred)
            }
            PayoutOutcome::Failed { reason } => {
                let dispositions = self
                    .ledger
                    .release_for_retry(&entry_ids, self.policy.max_retries)
                    .await?;
                let requeued = dispositions
                    .iter()
                    .filter(|(_, d)| *d == RetryDisposition::Requeued)
                    .count();
                let exhausted = dispositions.len() - requeued;
                if exhausted > 0 {
                    tracing::error!(
                        account_id = %batch.account_id,
                        reason = %reason,
                        exhausted,
                        "payout retries exhausted; entries need manual remediation"
                    );
                } else {
                    tracing::warn!(
                        account_id = %batch.account_id,
                        reason = %reason,
                        "payout failed, entries requeued"
                    );
                }
                Ok(BatchOutcome::Failed {
                    requeued,
                    exhausted,
                })
            }
        }
    }
}

enum BatchOutcome {
    Settled { entries: usize, amount: Money },
    Failed { requeued: usize, exhausted: usize },
    Deferred,
}
