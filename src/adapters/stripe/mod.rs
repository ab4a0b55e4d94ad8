//! Stripe adapters - the production payment rail.

mod transfer_rail;

pub use transfer_rail::{StripeRailConfig, StripeTransferRail};
