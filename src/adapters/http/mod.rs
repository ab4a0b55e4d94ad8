//! HTTP adapters - the inbound REST surface.
//!
//! Covers referral enrollment/resolution, visit tracking, the referrer
//! dashboard, and signed sale-event ingestion.

pub mod dto;
pub mod handlers;
pub mod routes;
pub mod webhook;

pub use handlers::ReferralAppState;
pub use routes::{referral_router, referral_routes};
pub use webhook::SaleWebhookVerifier;
