//! HTTP DTOs (Data Transfer Objects) for the referral API.
//!
//! These types define the JSON request/response structure and serve as the
//! boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::dashboard::DashboardView;
use crate::domain::attribution::VisitorContext;
use crate::domain::ledger::CommissionLedgerEntry;
use crate::domain::registry::ReferralAccount;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to enroll an owner into the referral program.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCodeRequest {
    /// Owner id in the external user system.
    pub owner_id: String,
}

/// Request to track a visit arriving through a referral link.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackVisitRequest {
    /// The referral code from the link.
    pub referral_code: String,

    /// Visitor fingerprint (hashed by the frontend).
    pub fingerprint: String,

    #[serde(default)]
    pub landing_page: Option<String>,

    #[serde(default)]
    pub referrer: Option<String>,

    #[serde(default)]
    pub utm_source: Option<String>,

    #[serde(default)]
    pub utm_campaign: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,
}

impl TrackVisitRequest {
    /// Splits the request into the code and the visitor context.
    pub fn into_parts(self) -> (String, VisitorContext) {
        let visitor = VisitorContext {
            fingerprint: self.fingerprint,
            landing_page: self.landing_page,
            referrer: self.referrer,
            utm_source: self.utm_source,
            utm_campaign: self.utm_campaign,
            session_id: self.session_id,
        };
        (self.referral_code, visitor)
    }
}

/// One sale event delivered by the sale-event source.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleEventPayload {
    /// External idempotency key, e.g. the payment intent id.
    pub sale_reference: String,

    /// Code the sale is attributed to.
    pub referral_code: String,

    /// Sale amount in minor units.
    pub sale_amount_minor: i64,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for a newly issued or resolved account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub account_id: String,
    pub referral_code: String,
    pub tier: String,
    pub active: bool,
}

impl From<&ReferralAccount> for AccountResponse {
    fn from(account: &ReferralAccount) -> Self {
        Self {
            account_id: account.id.to_string(),
            referral_code: account.referral_code.as_str().to_string(),
            tier: account.tier.to_string(),
            active: account.is_active(),
        }
    }
}

/// Response for a tracked visit.
#[derive(Debug, Clone, Serialize)]
pub struct TrackVisitResponse {
    pub attribution_id: String,
}

/// Response for an ingested sale event.
#[derive(Debug, Clone, Serialize)]
pub struct SaleEventResponse {
    /// False when the sale was valid but carried no resolvable referral.
    pub commissioned: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    pub replayed: bool,
}

impl SaleEventResponse {
    /// A recorded (or replayed) commission.
    pub fn commissioned(entry: &CommissionLedgerEntry, replayed: bool) -> Self {
        Self {
            commissioned: true,
            entry_id: Some(entry.id.to_string()),
            state: Some(entry.state.to_string()),
            replayed,
        }
    }

    /// A valid sale that earns nobody anything.
    pub fn not_commissioned() -> Self {
        Self {
            commissioned: false,
            entry_id: None,
            state: None,
            replayed: false,
        }
    }
}

/// Response for the referrer dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub referral_code: String,
    pub tier: String,
    pub current_rate: String,
    pub lifetime_qualifying_sales_minor: i64,
    pub lifetime_referral_count: u64,
    pub total_earned_minor: i64,
    pub total_settled_minor: i64,
    pub outstanding_minor: i64,
    pub failed_minor: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier_threshold_minor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier_progress_percent: Option<u8>,
}

impl From<DashboardView> for DashboardResponse {
    fn from(view: DashboardView) -> Self {
        let (next_tier, next_threshold, next_percent) = match &view.progress {
            Some(p) => (
                Some(p.next_tier.to_string()),
                Some(p.next_threshold.minor_units()),
                Some(p.percent),
            ),
            None => (None, None, None),
        };
        Self {
            referral_code: view.referral_code.as_str().to_string(),
            tier: view.tier.to_string(),
            current_rate: view.current_rate.to_string(),
            lifetime_qualifying_sales_minor: view.lifetime_qualifying_sales.minor_units(),
            lifetime_referral_count: view.lifetime_referral_count,
            total_earned_minor: view.earnings.total_earned.minor_units(),
            total_settled_minor: view.earnings.total_settled.minor_units(),
            outstanding_minor: view.earnings.outstanding.minor_units(),
            failed_minor: view.earnings.failed.minor_units(),
            next_tier,
            next_tier_threshold_minor: next_threshold,
            next_tier_progress_percent: next_percent,
        }
    }
}

/// Standard error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
