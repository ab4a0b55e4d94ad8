//! Notifier adapters for the tier-upgrade collaborator.

mod in_memory;
mod log_notifier;

pub use in_memory::InMemoryTierNotifier;
pub use log_notifier::LogTierNotifier;
