//! Axum router configuration for the referral API.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    deactivate_account, get_dashboard, ingest_sale_event, issue_code, resolve_code, track_visit,
    ReferralAppState,
};

/// Create the referral API router.
///
/// # Routes
///
/// - `POST /referrals` - Enroll an owner, issuing their referral code
/// - `GET /referrals/:code` - Resolve a referral code
/// - `POST /track` - Record a referred visit (analytics)
/// - `GET /accounts/:owner_id/dashboard` - Referrer dashboard rollup
/// - `POST /accounts/:owner_id/deactivate` - Opt a referrer out
/// - `POST /webhooks/sales` - Sale-event ingestion (signature verified)
pub fn referral_routes() -> Router<ReferralAppState> {
    Router::new()
        .route("/referrals", post(issue_code))
        .route("/referrals/:code", get(resolve_code))
        .route("/track", post(track_visit))
        .route("/accounts/:owner_id/dashboard", get(get_dashboard))
        .route("/accounts/:owner_id/deactivate", post(deactivate_account))
        .route("/webhooks/sales", post(ingest_sale_event))
}

/// Build the full router with state applied.
pub fn referral_router(state: ReferralAppState) -> Router {
    referral_routes().with_state(state)
}
