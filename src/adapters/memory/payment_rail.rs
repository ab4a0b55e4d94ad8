//! In-memory payment rail for testing and development.
//!
//! Deterministic stand-in for the real rail. Supports the failure modes
//! the settlement protocol must survive: terminal rejection per
//! destination, and a timeout where the transfer completes but the
//! response is lost (the reconcile-by-idempotency-key scenario).

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::OwnerId;
use crate::domain::ledger::IdempotencyKey;
use crate::ports::{PaymentRail, PayoutOutcome, PayoutRequest, RailError};

/// In-memory implementation of the PaymentRail port.
#[derive(Default)]
pub struct InMemoryPaymentRail {
    /// Confirmed outcomes by idempotency key.
    completed: RwLock<HashMap<String, PayoutOutcome>>,

    /// Every submission seen, in order.
    submissions: RwLock<Vec<PayoutRequest>>,

    /// Destinations that are terminally rejected.
    rejected_destinations: RwLock<HashSet<String>>,

    /// When set, the next submission completes the transfer but the caller
    /// sees a timeout.
    timeout_next: AtomicBool,

    /// Monotonic counter for transfer ids.
    transfer_counter: AtomicU64,
}

impl InMemoryPaymentRail {
    /// Creates a rail that confirms every payout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminally reject payouts to the given destination.
    pub async fn reject_destination(&self, destination: &OwnerId) {
        self.rejected_destinations
            .write()
            .await
            .insert(destination.as_str().to_string());
    }

    /// Stop rejecting a destination.
    pub async fn accept_destination(&self, destination: &OwnerId) {
        self.rejected_destinations
            .write()
            .await
            .remove(destination.as_str());
    }

    /// Make the next submission time out after the money moves.
    pub fn timeout_next_submission(&self) {
        self.timeout_next.store(true, Ordering::SeqCst);
    }

    /// Number of real transfers performed.
    pub async fn transfer_count(&self) -> usize {
        self.completed
            .read()
            .await
            .values()
            .filter(|o| matches!(o, PayoutOutcome::Succeeded { .. }))
            .count()
    }

    /// Every submission seen, for assertions.
    pub async fn submissions(&self) -> Vec<PayoutRequest> {
        self.submissions.read().await.clone()
    }

    fn next_transfer_id(&self) -> String {
        let n = self.transfer_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("tr_{:06}", n)
    }
}

#[async_trait]
impl PaymentRail for InMemoryPaymentRail {
    async fn submit_payout(&self, request: PayoutRequest) -> Result<PayoutOutcome, RailError> {
        self.submissions.write().await.push(request.clone());

        let key = request.idempotency_key.as_str().to_string();

        // Duplicate submission of a known key returns the stored outcome
        // without moving money again.
        if let Some(outcome) = self.completed.read().await.get(&key) {
            return Ok(outcome.clone());
        }

        if self
            .rejected_destinations
            .read()
            .await
            .contains(request.destination.as_str())
        {
            let outcome = PayoutOutcome::Failed {
                reason: "destination rejected".to_string(),
            };
            self.completed.write().await.insert(key, outcome.clone());
            return Ok(outcome);
        }

        let outcome = PayoutOutcome::Succeeded {
            transfer_id: self.next_transfer_id(),
        };
        self.completed.write().await.insert(key, outcome.clone());

        if self.timeout_next.swap(false, Ordering::SeqCst) {
            // The transfer completed but the response was lost.
            return Err(RailError::timeout("response deadline elapsed"));
        }

        Ok(outcome)
    }

    async fn query_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<PayoutOutcome>, RailError> {
        Ok(self.completed.read().await.get(key.as_str()).cloned())
    }
}
