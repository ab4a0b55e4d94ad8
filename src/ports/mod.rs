//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `AccountRepository` - Referral account persistence, atomic tier math
//! - `LedgerRepository` - Commission entries and the settlement protocol
//! - `AttributionStore` - Append-only visit analytics
//!
//! ## Collaborator Ports
//!
//! - `PaymentRail` - The external system that moves money
//! - `TierNotifier` - Fire-and-forget promotion announcements
//!
//! ## Infrastructure Ports
//!
//! - `ResolveCache` - Short-TTL code -> account-id cache
//! - `SettlementLock` - Single-flight guard for the batch job

mod account_repository;
mod attribution_store;
mod ledger_repository;
mod payment_rail;
mod resolve_cache;
mod settlement_lock;
mod tier_notifier;

pub use account_repository::{AccountRepository, InsertAccountOutcome, QualifyingSaleOutcome};
pub use attribution_store::AttributionStore;
pub use ledger_repository::{CommissionSummary, InsertEntryOutcome, LedgerRepository};
pub use payment_rail::{PaymentRail, PayoutOutcome, PayoutRequest, RailError, RailErrorCode};
pub use resolve_cache::ResolveCache;
pub use settlement_lock::SettlementLock;
pub use tier_notifier::TierNotifier;
