//! Reward tier definitions.
//!
//! Represents the performance bands a referrer can occupy. Tiers are
//! strictly ordered; promotion is one-way.

use serde::{Deserialize, Serialize};

/// Referrer reward tier.
///
/// Determines the commission rate applied to future sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Entry tier for every new referrer.
    Bronze,

    /// First promotion band.
    Silver,

    /// Mid-range band.
    Gold,

    /// High-volume band.
    Platinum,

    /// Top band.
    Diamond,
}

impl Tier {
    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
            Tier::Diamond => "Diamond",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = higher band. Used for the promotion-only guard.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 1,
            Tier::Gold => 2,
            Tier::Platinum => 3,
            Tier::Diamond => 4,
        }
    }

    /// Returns true if this tier outranks the other.
    pub fn outranks(&self, other: &Tier) -> bool {
        self.rank() > other.rank()
    }

    /// All tiers in ascending rank order.
    pub fn all() -> [Tier; 5] {
        [
            Tier::Bronze,
            Tier::Silver,
            Tier::Gold,
            Tier::Platinum,
            Tier::Diamond,
        ]
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
