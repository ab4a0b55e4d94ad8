//! Redis configuration (resolve cache)

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL; empty disables the shared cache and the
    /// in-process cache is used instead
    #[serde(default)]
    pub url: String,

    /// Resolve cache time-to-live in seconds
    #[serde(default = "default_resolve_ttl")]
    pub resolve_ttl_secs: u64,
}

impl RedisConfig {
    /// True when a shared cache is configured
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }

    /// Get resolve TTL as Duration
    pub fn resolve_ttl(&self) -> Duration {
        Duration::from_secs(self.resolve_ttl_secs)
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_enabled()
            && !self.url.starts_with("redis://")
            && !self.url.starts_with("rediss://")
        {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            resolve_ttl_secs: default_resolve_ttl(),
        }
    }
}

fn default_resolve_ttl() -> u64 {
    60
}
