//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Unique identifier for a referral account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralAccountId(Uuid);

impl ReferralAccountId {
    /// Creates a new random ReferralAccountId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ReferralAccountId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReferralAccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReferralAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReferralAccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a commission ledger entry.
///
/// Generated once at entry creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerEntryId(Uuid);

impl LedgerEntryId {
    /// Creates a new random LedgerEntryId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a LedgerEntryId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LedgerEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LedgerEntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for an attribution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributionId(Uuid);

impl AttributionId {
    /// Creates a new random AttributionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an AttributionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttributionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttributionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of the account owner in the external user system.
///
/// Opaque to this engine; we only require it to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Creates a new OwnerId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("owner_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External idempotency key of a sale, e.g. the originating payment id.
///
/// Unique across the ledger: re-processing the same reference is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleReference(String);

impl SaleReference {
    /// Creates a new SaleReference, returning error if empty.
    pub fn new(reference: impl Into<String>) -> Result<Self, ValidationError> {
        let reference = reference.into();
        if reference.is_empty() {
            return Err(ValidationError::empty_field("sale_reference"));
        }
        Ok(Self(reference))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SaleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_account_id_generates_unique_values() {
        let id1 = ReferralAccountId::new();
        let id2 = ReferralAccountId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn referral_account_id_parses_from_valid_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: ReferralAccountId = uuid_str.parse().unwrap();
        assert_eq!(id.to_string(), uuid_str);
    }

    #[test]
    fn ledger_entry_id_generates_unique_values() {
        let id1 = LedgerEntryId::new();
        let id2 = LedgerEntryId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn ledger_entry_id_serializes_to_json() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: LedgerEntryId = uuid_str.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid_str));
    }

    #[test]
    fn ledger_entry_ids_order_deterministically() {
        let a = LedgerEntryId::from_uuid(
            Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap(),
        );
        let b = LedgerEntryId::from_uuid(
            Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap(),
        );
        assert!(a < b);
    }

    #[test]
    fn attribution_id_generates_unique_values() {
        let id1 = AttributionId::new();
        let id2 = AttributionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn owner_id_accepts_non_empty_string() {
        let id = OwnerId::new("user-123").unwrap();
        assert_eq!(id.as_str(), "user-123");
    }

    #[test]
    fn owner_id_rejects_empty_string() {
        let result = OwnerId::new("");
        assert!(result.is_err());
        match result {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "owner_id"),
            _ => panic!("Expected EmptyField error"),
        }
    }

    #[test]
    fn sale_reference_accepts_non_empty_string() {
        let reference = SaleReference::new("pi_3OaK2x").unwrap();
        assert_eq!(reference.as_str(), "pi_3OaK2x");
    }

    #[test]
    fn sale_reference_rejects_empty_string() {
        assert!(SaleReference::new("").is_err());
    }

    #[test]
    fn sale_reference_displays_inner_value() {
        let reference = SaleReference::new("pi_3OaK2x").unwrap();
        assert_eq!(format!("{}", reference), "pi_3OaK2x");
    }
}
