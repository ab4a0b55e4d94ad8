//! Referral code value object.
//!
//! Codes are opaque uppercase tokens, unique across all active and
//! historical codes, and immutable once issued.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::ValidationError;

/// Prefix carried by every generated code.
const CODE_PREFIX: &str = "REF-";

/// Number of random characters after the prefix.
const CODE_RANDOM_LEN: usize = 10;

/// A referral code identifying the referring account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Parses a code supplied from the outside, normalizing to uppercase.
    ///
    /// Accepts 4-32 characters from `[A-Z0-9-]` after normalization.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let code = raw.into().trim().to_uppercase();
        if code.is_empty() {
            return Err(ValidationError::empty_field("referral_code"));
        }
        if code.len() < 4 || code.len() > 32 {
            return Err(ValidationError::invalid_format(
                "referral_code",
                "code must be 4-32 characters",
            ));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::invalid_format(
                "referral_code",
                "code may only contain A-Z, 0-9 and '-'",
            ));
        }
        Ok(Self(code))
    }

    /// Generates a fresh code.
    ///
    /// Uniqueness is ultimately enforced by the store's unique constraint;
    /// the UUID source makes collisions vanishingly rare, and issuing
    /// retries on constraint violation.
    pub fn generate() -> Self {
        let random: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(CODE_RANDOM_LEN)
            .collect::<String>()
            .to_uppercase();
        Self(format!("{}{}", CODE_PREFIX, random))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
