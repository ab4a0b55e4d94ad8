//! Ledger-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, LedgerEntryId};

/// Errors from commission ledger operations.
#[derive(Debug, Clone)]
pub enum LedgerError {
    /// The sale's referral code does not resolve; no entry is created.
    UnknownReferral(String),

    /// The code resolves but the account no longer earns commissions.
    ReferralInactive(String),

    /// The sale amount failed validation.
    InvalidAmount { reason: String },

    /// A computed commission broke the `commission <= sale` bound.
    ///
    /// Should be impossible while rate bounds hold; the entry is never
    /// persisted and the condition is reported loudly.
    InvariantViolation { message: String },

    /// The entry does not exist.
    EntryNotFound(LedgerEntryId),

    /// The requested transition is not legal from the entry's state.
    InvalidState { current: String, attempted: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl LedgerError {
    pub fn unknown_referral(code: impl Into<String>) -> Self {
        LedgerError::UnknownReferral(code.into())
    }

    pub fn referral_inactive(code: impl Into<String>) -> Self {
        LedgerError::ReferralInactive(code.into())
    }

    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        LedgerError::InvalidAmount {
            reason: reason.into(),
        }
    }

    pub fn invariant_violation(message: impl Into<String>) -> Self {
        LedgerError::InvariantViolation {
            message: message.into(),
        }
    }

    pub fn entry_not_found(id: LedgerEntryId) -> Self {
        LedgerError::EntryNotFound(id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        LedgerError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        LedgerError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::UnknownReferral(_) => ErrorCode::ReferralNotFound,
            LedgerError::ReferralInactive(_) => ErrorCode::ReferralInactive,
            LedgerError::InvalidAmount { .. } => ErrorCode::ValidationFailed,
            LedgerError::InvariantViolation { .. } => ErrorCode::InvariantViolation,
            LedgerError::EntryNotFound(_) => ErrorCode::EntryNotFound,
            LedgerError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            LedgerError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            LedgerError::UnknownReferral(code) => {
                format!("Referral code '{}' does not resolve; sale not commissioned", code)
            }
            LedgerError::ReferralInactive(code) => {
                format!("Referral code '{}' belongs to a deactivated account", code)
            }
            LedgerError::InvalidAmount { reason } => format!("Invalid sale amount: {}", reason),
            LedgerError::InvariantViolation { message } => {
                format!("Ledger invariant violated: {}", message)
            }
            LedgerError::EntryNotFound(id) => format!("Ledger entry {} not found", id),
            LedgerError::InvalidState { current, attempted } => {
                format!("Cannot {} a ledger entry in {} state", attempted, current)
            }
            LedgerError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Infrastructure(_))
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for LedgerError {}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => LedgerError::InvalidAmount {
                reason: err.message,
            },
            ErrorCode::InvariantViolation => LedgerError::InvariantViolation {
                message: err.message,
            },
            _ => LedgerError::Infrastructure(err.message),
        }
    }
}
