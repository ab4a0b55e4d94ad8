//! Tier table configuration
//!
//! The tier schedule ships with a built-in default mirroring the
//! program's launch bands; deployments override it with a YAML file:
//!
//! ```yaml
//! - tier: bronze
//!   min_lifetime_sales: 0
//!   rate: "0.15"
//! - tier: silver
//!   min_lifetime_sales: 500000
//!   rate: "0.20"
//! ```
//!
//! Amounts are minor units. Ordering is validated on load; a schedule
//! with non-increasing thresholds or rates never reaches the engine.

use serde::Deserialize;
use std::path::Path;

use crate::domain::foundation::{CommissionRate, Money};
use crate::domain::tiers::{Tier, TierDefinition, TierSchedule};

use super::error::ConfigError;

/// Tier table configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TiersConfig {
    /// Path to a YAML tier table; empty uses the built-in default
    #[serde(default)]
    pub table_path: String,
}

/// One YAML row.
#[derive(Debug, Deserialize)]
struct TierRow {
    tier: Tier,
    min_lifetime_sales: i64,
    rate: String,
}

impl TiersConfig {
    /// Load the configured schedule, or the default when no path is set.
    pub fn load_schedule(&self) -> Result<TierSchedule, ConfigError> {
        if self.table_path.is_empty() {
            return Ok(TierSchedule::default());
        }
        Self::load_from_file(Path::new(&self.table_path))
    }

    /// Load and validate a schedule from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<TierSchedule, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::TierTable(format!("{}: {}", path.display(), e)))?;
        let rows: Vec<TierRow> = serde_yaml::from_str(&raw)
            .map_err(|e| ConfigError::TierTable(e.to_string()))?;

        let definitions = rows
            .into_iter()
            .map(|row| {
                Ok(TierDefinition {
                    tier: row.tier,
                    min_lifetime_sales: Money::from_minor_units(row.min_lifetime_sales)
                        .map_err(|e| ConfigError::TierTable(e.to_string()))?,
                    rate: CommissionRate::parse(&row.rate)
                        .map_err(|e| ConfigError::TierTable(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        TierSchedule::new(definitions).map_err(|e| ConfigError::TierTable(e.to_string()))
    }
}
