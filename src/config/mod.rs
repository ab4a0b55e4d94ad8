//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `REFERRAL_ENGINE` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use referral_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payout;
mod redis;
mod server;
mod tiers;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payout::PayoutConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use tiers::TiersConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment
/// variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (resolve cache)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Payout configuration (Stripe rail + settlement cycle)
    pub payout: PayoutConfig,

    /// Tier table configuration
    #[serde(default)]
    pub tiers: TiersConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `REFERRAL_ENGINE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `REFERRAL_ENGINE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `REFERRAL_ENGINE__DATABASE__URL=...` -> `database.url = ...`
    /// - `REFERRAL_ENGINE__PAYOUT__COOL_DOWN_HOURS=48` -> 48 h buffer
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("REFERRAL_ENGINE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.payout.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
