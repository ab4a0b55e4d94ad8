//! Tier notifier port - outbound promotion announcements.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::tiers::TierUpgrade;

/// Port for the external notification collaborator.
///
/// Fire-and-forget: callers log failures and move on; this subsystem never
/// retries notifications and never lets them affect ledger or tier state.
#[async_trait]
pub trait TierNotifier: Send + Sync {
    /// Announce a promotion.
    async fn tier_upgraded(&self, upgrade: &TierUpgrade) -> Result<(), DomainError>;
}
