//! Commission ledger domain - the immutable financial record of record.

mod batch;
mod entry;
mod errors;
mod state;

pub use batch::{IdempotencyKey, PayoutBatch};
pub use entry::{CommissionLedgerEntry, RetryDisposition};
pub use errors::LedgerError;
pub use state::EntryState;
