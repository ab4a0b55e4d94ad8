//! Payout configuration (payment rail + settlement cycle)

use serde::Deserialize;
use std::time::Duration;

use crate::application::handlers::payout::{SettlementPolicy, SettlementTaskConfig};

use super::error::ValidationError;

/// Payout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PayoutConfig {
    /// Stripe API key
    #[serde(default)]
    pub stripe_api_key: String,

    /// Sale-event webhook signing secret
    #[serde(default)]
    pub sale_webhook_secret: String,

    /// Dispute/chargeback buffer before an entry becomes eligible, hours
    #[serde(default = "default_cool_down_hours")]
    pub cool_down_hours: u64,

    /// Failed payout attempts before an entry parks in Failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds between settlement cycle starts
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,

    /// Deadline for one payment-rail call, seconds
    #[serde(default = "default_rail_timeout")]
    pub rail_timeout_secs: u64,
}

impl PayoutConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Settlement policy derived from this configuration
    pub fn settlement_policy(&self) -> SettlementPolicy {
        SettlementPolicy {
            cool_down: Duration::from_secs(self.cool_down_hours * 60 * 60),
            max_retries: self.max_retries,
            rail_timeout: Duration::from_secs(self.rail_timeout_secs),
        }
    }

    /// Settlement task configuration derived from this configuration
    pub fn settlement_task_config(&self) -> SettlementTaskConfig {
        SettlementTaskConfig {
            cycle_interval: Duration::from_secs(self.cycle_interval_secs),
        }
    }

    /// Validate payout configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if self.sale_webhook_secret.is_empty() {
            return Err(ValidationError::InvalidWebhookSecret);
        }
        if self.cool_down_hours == 0 {
            return Err(ValidationError::InvalidCoolDown);
        }
        if self.max_retries == 0 {
            return Err(ValidationError::InvalidMaxRetries);
        }
        if self.cycle_interval_secs == 0 {
            return Err(ValidationError::InvalidCycleInterval);
        }
        Ok(())
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            sale_webhook_secret: String::new(),
            cool_down_hours: default_cool_down_hours(),
            max_retries: default_max_retries(),
            cycle_interval_secs: default_cycle_interval(),
            rail_timeout_secs: default_rail_timeout(),
        }
    }
}

fn default_cool_down_hours() -> u64 {
    24
}

fn default_max_retries() -> u32 {
    5
}

fn default_cycle_interval() -> u64 {
    15 * 60
}

fn default_rail_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> PayoutConfig {
        PayoutConfig {
            stripe_api_key: "sk_test_xxx".to_string(),
            sale_webhook_secret: "whsec_xxx".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_config_is_valid() {
        assert!(minimal().validate().is_ok());
        assert!(minimal().is_test_mode());
    }

    #[test]
    fn missing_api_key_is_invalid() {
        assert!(PayoutConfig::default().validate().is_err());
    }

    #[test]
    fn wrong_key_prefix_is_invalid() {
        let config = PayoutConfig {
            stripe_api_key: "pk_test_xxx".to_string(),
            ..minimal()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cool_down_is_invalid() {
        let config = PayoutConfig {
            cool_down_hours: 0,
            ..minimal()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn policy_reflects_hours_and_retries() {
        let config = PayoutConfig {
            cool_down_hours: 48,
            max_retries: 3,
            ..minimal()
        };
        let policy = config.settlement_policy();
        assert_eq!(policy.cool_down, Duration::from_secs(48 * 60 * 60));
        assert_eq!(policy.max_retries, 3);
    }
}
