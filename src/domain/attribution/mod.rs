//! Attribution domain - analytics-only visit records.

mod errors;
mod record;

pub use errors::AttributionError;
pub use record::{AttributionRecord, VisitorContext};
