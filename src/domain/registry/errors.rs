//! Registry-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, ReferralAccountId};

/// Errors from referral registry operations.
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// The owner already holds an active referral code.
    DuplicateAccount(OwnerId),

    /// A generated code collided and retries were exhausted.
    CodeSpaceExhausted,

    /// The referral code does not resolve to any account.
    UnknownReferral(String),

    /// The account exists but is deactivated.
    ReferralInactive(ReferralAccountId),

    /// The account id does not resolve.
    AccountNotFound(ReferralAccountId),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl RegistryError {
    pub fn duplicate_account(owner_id: OwnerId) -> Self {
        RegistryError::DuplicateAccount(owner_id)
    }

    pub fn unknown_referral(code: impl Into<String>) -> Self {
        RegistryError::UnknownReferral(code.into())
    }

    pub fn referral_inactive(id: ReferralAccountId) -> Self {
        RegistryError::ReferralInactive(id)
    }

    pub fn account_not_found(id: ReferralAccountId) -> Self {
        RegistryError::AccountNotFound(id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        RegistryError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::DuplicateAccount(_) => ErrorCode::DuplicateAccount,
            RegistryError::CodeSpaceExhausted => ErrorCode::DuplicateReferralCode,
            RegistryError::UnknownReferral(_) => ErrorCode::ReferralNotFound,
            RegistryError::ReferralInactive(_) => ErrorCode::ReferralInactive,
            RegistryError::AccountNotFound(_) => ErrorCode::AccountNotFound,
            RegistryError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            RegistryError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            RegistryError::DuplicateAccount(owner_id) => {
                format!("Owner {} already has an active referral code", owner_id)
            }
            RegistryError::CodeSpaceExhausted => {
                "Could not generate a unique referral code".to_string()
            }
            RegistryError::UnknownReferral(code) => {
                format!("Referral code '{}' does not resolve", code)
            }
            RegistryError::ReferralInactive(id) => {
                format!("Referral account {} is deactivated", id)
            }
            RegistryError::AccountNotFound(id) => {
                format!("Referral account {} not found", id)
            }
            RegistryError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            RegistryError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for RegistryError {}

impl From<DomainError> for RegistryError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => RegistryError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => RegistryError::Infrastructure(err.message),
        }
    }
}
