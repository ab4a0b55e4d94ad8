//! Payment rail port - the external system that actually moves money.
//!
//! # Design
//!
//! - **Idempotency-keyed**: every submission carries a deterministic key;
//!   the rail collapses duplicate submissions of the same key.
//! - **Timeout is not failure**: a timed-out call has an unknown outcome.
//!   Callers must reconcile through `query_by_idempotency_key` before
//!   resubmitting, never blind-retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, OwnerId};
use crate::domain::ledger::IdempotencyKey;

/// One aggregate payout submission.
#[derive(Debug, Clone)]
pub struct PayoutRequest {
    /// Deterministic key for duplicate collapsing.
    pub idempotency_key: IdempotencyKey,

    /// Destination account in the external user/payout system.
    pub destination: OwnerId,

    /// Aggregate amount to transfer.
    pub amount: Money,
}

/// Confirmed result of a payout submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutOutcome {
    /// The transfer completed; money moved.
    Succeeded {
        /// The rail's transfer reference.
        transfer_id: String,
    },

    /// The rail accepted the request but has not confirmed it yet.
    Accepted,

    /// The rail rejected the request.
    Failed {
        /// Rail-supplied reason.
        reason: String,
    },
}

/// Errors from payment rail operations.
#[derive(Debug, Clone)]
pub struct RailError {
    /// Error category.
    pub code: RailErrorCode,

    /// Human-readable message.
    pub message: String,
}

impl RailError {
    /// Create a new rail error.
    pub fn new(code: RailErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The call did not complete inside its deadline; outcome unknown.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RailErrorCode::Timeout, message)
    }

    /// Connectivity problem before the request reached the rail.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RailErrorCode::Network, message)
    }

    /// Credentials rejected.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(RailErrorCode::Authentication, message)
    }

    /// The rail answered with an unexpected error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(RailErrorCode::Provider, message)
    }

    /// The rail errored server-side; the request may still have taken
    /// effect.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RailErrorCode::Unavailable, message)
    }

    /// True when the outcome of the submission is unknown and must be
    /// reconciled by idempotency key before any resubmission.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self.code, RailErrorCode::Timeout | RailErrorCode::Unavailable)
    }
}

impl std::fmt::Display for RailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RailError {}

/// Payment rail error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RailErrorCode {
    /// Deadline elapsed; outcome unknown.
    Timeout,

    /// Request never reached the rail.
    Network,

    /// API credentials rejected.
    Authentication,

    /// Rail-side error response; request definitely not accepted.
    Provider,

    /// Rail-side server failure; request may or may not have landed.
    Unavailable,
}

impl std::fmt::Display for RailErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RailErrorCode::Timeout => "timeout",
            RailErrorCode::Network => "network",
            RailErrorCode::Authentication => "authentication",
            RailErrorCode::Provider => "provider",
            RailErrorCode::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

/// Port for the external payment rail.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    /// Submit an aggregate payout.
    ///
    /// Submitting the same idempotency key twice must not produce a second
    /// real-world transfer.
    async fn submit_payout(&self, request: PayoutRequest) -> Result<PayoutOutcome, RailError>;

    /// Look up the prior result for an idempotency key, if the rail has
    /// seen it.
    async fn query_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<PayoutOutcome>, RailError>;
}
