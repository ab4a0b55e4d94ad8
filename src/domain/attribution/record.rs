//! Attribution records - analytics-only visit tracking.
//!
//! A record ties a visit to a referral code. It carries no financial
//! weight; sales are attributed from the sale event itself, so a lost or
//! failed attribution never blocks commission recording.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AttributionId, ReferralAccountId, Timestamp};
use crate::domain::registry::ReferralCode;

/// Context captured about the visitor at tracking time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorContext {
    /// Stable fingerprint of the visitor (hashed IP + user agent or similar).
    pub fingerprint: String,

    /// Page the visitor landed on.
    pub landing_page: Option<String>,

    /// Referring URL, if the browser sent one.
    pub referrer: Option<String>,

    /// Campaign source tag.
    pub utm_source: Option<String>,

    /// Campaign name tag.
    pub utm_campaign: Option<String>,

    /// Visitor session id, if the frontend assigned one.
    pub session_id: Option<String>,
}

/// One tracked visit. Append-only; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionRecord {
    /// Unique identifier for this record.
    pub id: AttributionId,

    /// Code the visit arrived through.
    pub referral_code: ReferralCode,

    /// Account the code resolved to at tracking time.
    pub account_id: ReferralAccountId,

    /// Visitor context snapshot.
    pub visitor: VisitorContext,

    /// When the visit was tracked.
    pub occurred_at: Timestamp,
}

impl AttributionRecord {
    /// Creates a record for a resolved visit.
    pub fn track(
        referral_code: ReferralCode,
        account_id: ReferralAccountId,
        visitor: VisitorContext,
    ) -> Self {
        Self {
            id: AttributionId::new(),
            referral_code,
            account_id,
            visitor,
            occurred_at: Timestamp::now(),
        }
    }
}
