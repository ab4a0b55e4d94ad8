//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, monetary types, and error types
//! that form the vocabulary of the referral engine domain.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AttributionId, LedgerEntryId, OwnerId, ReferralAccountId, SaleReference};
pub use money::{CommissionRate, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
