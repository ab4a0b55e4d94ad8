//! TrackVisitHandler - Command handler for attribution tracking.
//!
//! Analytics only: appends one record per tracked visit and touches
//! neither the ledger nor tiers. A failure here never blocks a sale from
//! being attributed, because sales carry their referral code in the sale
//! event itself.

use std::sync::Arc;

use crate::domain::attribution::{AttributionError, AttributionRecord, VisitorContext};
use crate::domain::foundation::AttributionId;
use crate::domain::registry::{ReferralCode, RegistryError};
use crate::ports::AttributionStore;

use super::super::registry::ResolveCodeHandler;

/// Command to track one visit arriving through a referral link.
#[derive(Debug, Clone)]
pub struct TrackVisitCommand {
    pub referral_code: String,
    pub visitor: VisitorContext,
}

/// Handler for visit tracking.
pub struct TrackVisitHandler {
    resolver: Arc<ResolveCodeHandler>,
    attributions: Arc<dyn AttributionStore>,
}

impl TrackVisitHandler {
    pub fn new(
        resolver: Arc<ResolveCodeHandler>,
        attributions: Arc<dyn AttributionStore>,
    ) -> Self {
        Self {
            resolver,
            attributions,
        }
    }

    pub async fn handle(&self, cmd: TrackVisitCommand) -> Result<AttributionId, AttributionError> {
        let code = ReferralCode::parse(&cmd.referral_code)
            .map_err(|e| AttributionError::invalid_code(e.to_string()))?;

        let account = self.resolver.handle(&code).await.map_err(|e| match e {
            RegistryError::UnknownReferral(code) => AttributionError::unknown_referral(code),
            other => AttributionError::infrastructure(other.message()),
        })?;

        // Deactivated accounts still get analytics; only commissions stop.
        let record = AttributionRecord::track(code, account.id, cmd.visitor);
        self.attributions.append(&record).await?;

        tracing::debug!(
            attribution_id = %record.id,
            account_id = %account.id,
            "visit tracked"
        );

        Ok(record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryAccountRepository, InMemoryAttributionStore, InMemoryResolveCache,
    };
    use crate::domain::foundation::{OwnerId, ReferralAccountId};
    use crate::domain::registry::ReferralAccount;
    use crate::domain::tiers::TierSchedule;
    use crate::ports::AccountRepository;
    use std::time::Duration;

    struct Fixture {
        handler: TrackVisitHandler,
        accounts: Arc<InMemoryAccountRepository>,
        attributions: Arc<InMemoryAttributionStore>,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let cache = Arc::new(InMemoryResolveCache::new());
        let resolver = Arc::new(ResolveCodeHandler::new(
            accounts.clone(),
            cache,
            Duration::from_secs(60),
        ));
        let attributions = Arc::new(InMemoryAttributionStore::new());
        Fixture {
            handler: TrackVisitHandler::new(resolver, attributions.clone()),
            accounts,
            attributions,
        }
    }

    async fn seed_account(fixture: &Fixture) -> ReferralAccount {
        let account = ReferralAccount::create(
            ReferralAccountId::new(),
            OwnerId::new("owner-1").unwrap(),
            crate::domain::registry::ReferralCode::generate(),
            &TierSchedule::default(),
        );
        fixture.accounts.insert(&account).await.unwrap();
        account
    }

    #[tokio::test]
    async fn tracks_visit_for_known_code() {
        let fixture = fixture();
        let account = seed_account(&fixture).await;

        let id = fixture
            .handler
            .handle(TrackVisitCommand {
                referral_code: account.referral_code.as_str().to_string(),
                visitor: VisitorContext {
                    fingerprint: "fp-1".to_string(),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        let recent = fixture
            .attributions
            .recent_for_account(&account.id, 10)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id);
    }

    #[tokio::test]
    async fn unknown_code_tracks_nothing() {
        let fixture = fixture();
        let err = fixture
            .handler
            .handle(TrackVisitCommand {
                referral_code: "REF-UNKNOWN1".to_string(),
                visitor: VisitorContext::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AttributionError::UnknownReferral(_)));
        assert_eq!(fixture.attributions.len().await, 0);
    }

    #[tokio::test]
    async fn malformed_code_is_invalid() {
        let fixture = fixture();
        let err = fixture
            .handler
            .handle(TrackVisitCommand {
                referral_code: "no".to_string(),
                visitor: VisitorContext::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AttributionError::InvalidCode { .. }));
    }

    #[tokio::test]
    async fn deactivated_account_still_tracked() {
        let fixture = fixture();
        let account = seed_account(&fixture).await;
        fixture.accounts.deactivate(&account.id).await.unwrap();

        fixture
            .handler
            .handle(TrackVisitCommand {
                referral_code: account.referral_code.as_str().to_string(),
                visitor: VisitorContext::default(),
            })
            .await
            .unwrap();
        assert_eq!(fixture.attributions.len().await, 1);
    }
}
