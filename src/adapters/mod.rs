//! Adapters - implementations of the ports for concrete infrastructure.
//!
//! # Module Organization
//!
//! - `http` - Inbound REST surface (axum)
//! - `postgres` - Production persistence (sqlx)
//! - `redis` - Shared resolve cache
//! - `stripe` - Production payment rail (Stripe Transfers)
//! - `notify` - Tier-upgrade notification sinks
//! - `memory` - In-memory implementations for tests and local development

pub mod http;
pub mod memory;
pub mod notify;
pub mod postgres;
pub mod redis;
pub mod stripe;
