//! Dashboard read-side handlers.

mod account_dashboard;

pub use account_dashboard::{AccountDashboardHandler, DashboardView, TierProgress};
