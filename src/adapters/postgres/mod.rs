//! PostgreSQL adapters - production persistence for every storage port.

mod account_repository;
mod advisory_lock;
mod attribution_store;
mod ledger_repository;

pub use account_repository::PostgresAccountRepository;
pub use advisory_lock::PostgresSettlementLock;
pub use attribution_store::PostgresAttributionStore;
pub use ledger_repository::PostgresLedgerRepository;
