//! Ledger command handlers.

mod record_sale;

pub use record_sale::{RecordSaleCommand, RecordSaleHandler, RecordSaleResult};
