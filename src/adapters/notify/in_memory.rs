//! In-memory tier notifier for tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::tiers::TierUpgrade;
use crate::ports::TierNotifier;

/// Notifier that records every upgrade for assertions.
#[derive(Default)]
pub struct InMemoryTierNotifier {
    upgrades: RwLock<Vec<TierUpgrade>>,
    fail: bool,
}

impl InMemoryTierNotifier {
    /// Creates a recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier whose sends always fail, for fire-and-forget
    /// tests.
    pub fn failing() -> Self {
        Self {
            upgrades: RwLock::new(Vec::new()),
            fail: true,
        }
    }

    /// Upgrades seen so far.
    pub async fn upgrades(&self) -> Vec<TierUpgrade> {
        self.upgrades.read().await.clone()
    }
}

#[async_trait]
impl TierNotifier for InMemoryTierNotifier {
    async fn tier_upgraded(&self, upgrade: &TierUpgrade) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::InternalError,
                "notification channel unavailable",
            ));
        }
        self.upgrades.write().await.push(upgrade.clone());
        Ok(())
    }
}
