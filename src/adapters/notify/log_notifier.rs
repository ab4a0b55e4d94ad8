//! Tracing-based tier notifier.
//!
//! Production wiring for the notification collaborator when no external
//! channel is configured: promotions are logged and nothing else happens.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::tiers::TierUpgrade;
use crate::ports::TierNotifier;

/// Notifier that logs promotions through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct LogTierNotifier;

impl LogTierNotifier {
    /// Creates the notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TierNotifier for LogTierNotifier {
    async fn tier_upgraded(&self, upgrade: &TierUpgrade) -> Result<(), DomainError> {
        tracing::info!(
            account_id = %upgrade.account_id,
            old_tier = %upgrade.old_tier,
            new_tier = %upgrade.new_tier,
            new_rate = %upgrade.new_rate,
            "referrer promoted"
        );
        Ok(())
    }
}
