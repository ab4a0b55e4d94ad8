//! Tier domain - reward bands and the threshold/rate table.

mod schedule;
mod tier;
mod upgrade;

pub use schedule::{TierDefinition, TierSchedule};
pub use tier::Tier;
pub use upgrade::TierUpgrade;
