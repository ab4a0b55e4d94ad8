//! IssueCodeHandler - Command handler for enrolling a referrer.

use std::sync::Arc;

use crate::domain::foundation::{OwnerId, ReferralAccountId};
use crate::domain::registry::{ReferralAccount, ReferralCode, RegistryError};
use crate::domain::tiers::TierSchedule;
use crate::ports::{AccountRepository, InsertAccountOutcome};

/// Generated codes are effectively unique; a collision means we lost a
/// 1-in-2^48 lottery, so a couple of retries is plenty.
const MAX_CODE_ATTEMPTS: u32 = 3;

/// Command to enroll an owner into the referral program.
#[derive(Debug, Clone)]
pub struct IssueCodeCommand {
    pub owner_id: OwnerId,
}

/// Handler for issuing referral codes.
///
/// One active code per owner: a second enrollment attempt fails with
/// `DuplicateAccount` and surfaces the existing account nowhere (callers
/// resolve it separately if needed).
pub struct IssueCodeHandler {
    accounts: Arc<dyn AccountRepository>,
    schedule: Arc<TierSchedule>,
}

impl IssueCodeHandler {
    pub fn new(accounts: Arc<dyn AccountRepository>, schedule: Arc<TierSchedule>) -> Self {
        Self { accounts, schedule }
    }

    pub async fn handle(&self, cmd: IssueCodeCommand) -> Result<ReferralAccount, RegistryError> {
        // Fast path rejection before generating anything.
        if self.accounts.find_by_owner(&cmd.owner_id).await?.is_some() {
            return Err(RegistryError::duplicate_account(cmd.owner_id));
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let account = ReferralAccount::create(
                ReferralAccountId::new(),
                cmd.owner_id.clone(),
                ReferralCode::generate(),
                &self.schedule,
            );

            match self.accounts.insert(&account).await? {
                InsertAccountOutcome::Inserted => {
                    tracing::info!(
                        account_id = %account.id,
                        referral_code = %account.referral_code,
                        "referral account created"
                    );
                    return Ok(account);
                }
                InsertAccountOutcome::DuplicateOwner(_) => {
                    // Lost a race with a concurrent enrollment.
                    return Err(RegistryError::duplicate_account(cmd.owner_id));
                }
                InsertAccountOutcome::DuplicateCode => {
                    tracing::warn!(referral_code = %account.referral_code, "code collision, regenerating");
                }
            }
        }

        Err(RegistryError::CodeSpaceExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountRepository;
    use crate::domain::tiers::Tier;

    fn handler() -> (IssueCodeHandler, Arc<InMemoryAccountRepository>) {
        let repo = Arc::new(InMemoryAccountRepository::new());
        let handler = IssueCodeHandler::new(repo.clone(), Arc::new(TierSchedule::default()));
        (handler, repo)
    }

    #[tokio::test]
    async fn issues_account_at_entry_tier() {
        let (handler, _) = handler();
        let account = handler
            .handle(IssueCodeCommand {
                owner_id: OwnerId::new("owner-1").unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(account.tier, Tier::Bronze);
        assert!(account.referral_code.as_str().starts_with("REF-"));
        assert!(account.is_active());
    }

    #[tokio::test]
    async fn second_enrollment_is_duplicate_account() {
        let (handler, _) = handler();
        let owner = OwnerId::new("owner-1").unwrap();

        handler
            .handle(IssueCodeCommand {
                owner_id: owner.clone(),
            })
            .await
            .unwrap();

        let err = handler
            .handle(IssueCodeCommand { owner_id: owner })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAccount(_)));
    }

    #[tokio::test]
    async fn issued_codes_are_unique_across_owners() {
        let (handler, _) = handler();
        let a = handler
            .handle(IssueCodeCommand {
                owner_id: OwnerId::new("owner-1").unwrap(),
            })
            .await
            .unwrap();
        let b = handler
            .handle(IssueCodeCommand {
                owner_id: OwnerId::new("owner-2").unwrap(),
            })
            .await
            .unwrap();
        assert_ne!(a.referral_code, b.referral_code);
    }
}
