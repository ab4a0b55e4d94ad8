//! Attribution-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors from visit tracking.
#[derive(Debug, Clone)]
pub enum AttributionError {
    /// The supplied code failed validation.
    InvalidCode { reason: String },

    /// The code does not resolve to any account.
    UnknownReferral(String),

    /// Infrastructure error.
    Infrastructure(String),
}

impl AttributionError {
    pub fn invalid_code(reason: impl Into<String>) -> Self {
        AttributionError::InvalidCode {
            reason: reason.into(),
        }
    }

    pub fn unknown_referral(code: impl Into<String>) -> Self {
        AttributionError::UnknownReferral(code.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        AttributionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AttributionError::InvalidCode { .. } => ErrorCode::ValidationFailed,
            AttributionError::UnknownReferral(_) => ErrorCode::ReferralNotFound,
            AttributionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl std::fmt::Display for AttributionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributionError::InvalidCode { reason } => {
                write!(f, "Invalid referral code: {}", reason)
            }
            AttributionError::UnknownReferral(code) => {
                write!(f, "Referral code '{}' does not resolve", code)
            }
            AttributionError::Infrastructure(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AttributionError {}

impl From<DomainError> for AttributionError {
    fn from(err: DomainError) -> Self {
        AttributionError::Infrastructure(err.message)
    }
}
