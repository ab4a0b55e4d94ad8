//! Tier upgrade notification payload.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CommissionRate, ReferralAccountId, Timestamp};

use super::Tier;

/// Emitted when a referrer crosses a tier threshold.
///
/// Consumed by the external notification collaborator; carries enough to
/// render a congratulation message without another lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierUpgrade {
    /// Account that was promoted.
    pub account_id: ReferralAccountId,

    /// Tier held before the promotion.
    pub old_tier: Tier,

    /// Tier held after the promotion.
    pub new_tier: Tier,

    /// Rate applied to the account's future entries.
    pub new_rate: CommissionRate,

    /// When the promotion happened.
    pub occurred_at: Timestamp,
}
