//! DeactivateAccountHandler - Command handler for opting a referrer out.
//!
//! Accounts are never deleted: deactivation flips the status flag, the
//! code keeps resolving for analytics, and commission recording stops.

use std::sync::Arc;

use crate::domain::foundation::OwnerId;
use crate::domain::registry::{ReferralAccount, RegistryError};
use crate::ports::AccountRepository;

/// Handler for deactivating referral accounts.
pub struct DeactivateAccountHandler {
    accounts: Arc<dyn AccountRepository>,
}

impl DeactivateAccountHandler {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// Idempotent: deactivating an already-deactivated account succeeds.
    pub async fn handle(&self, owner_id: &OwnerId) -> Result<ReferralAccount, RegistryError> {
        let account = self
            .accounts
            .find_by_owner(owner_id)
            .await?
            .ok_or_else(|| RegistryError::unknown_referral(owner_id.as_str()))?;

        self.accounts.deactivate(&account.id).await?;

        let account = self
            .accounts
            .find_by_id(&account.id)
            .await?
            .ok_or_else(|| RegistryError::account_not_found(account.id))?;

        tracing::info!(account_id = %account.id, "referral account deactivated");
        Ok(account)
    }
}
