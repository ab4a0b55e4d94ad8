//! HTTP handlers for the referral API.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::attribution::{TrackVisitCommand, TrackVisitHandler};
use crate::application::handlers::dashboard::AccountDashboardHandler;
use crate::application::handlers::ledger::{RecordSaleCommand, RecordSaleHandler};
use crate::application::handlers::registry::{
    DeactivateAccountHandler, IssueCodeCommand, IssueCodeHandler, ResolveCodeHandler,
};
use crate::domain::attribution::AttributionError;
use crate::domain::foundation::{ErrorCode, OwnerId, Timestamp};
use crate::domain::ledger::LedgerError;
use crate::domain::registry::{ReferralCode, RegistryError};
use crate::domain::tiers::TierSchedule;
use crate::ports::{
    AccountRepository, AttributionStore, LedgerRepository, ResolveCache, TierNotifier,
};

use super::dto::{
    AccountResponse, DashboardResponse, ErrorResponse, IssueCodeRequest, SaleEventPayload,
    SaleEventResponse, TrackVisitRequest, TrackVisitResponse,
};
use super::webhook::{SaleWebhookVerifier, SIGNATURE_HEADER};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; everything inside is Arc-wrapped.
#[derive(Clone)]
pub struct ReferralAppState {
    pub accounts: Arc<dyn AccountRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub attributions: Arc<dyn AttributionStore>,
    pub resolve_cache: Arc<dyn ResolveCache>,
    pub notifier: Arc<dyn TierNotifier>,
    pub schedule: Arc<TierSchedule>,
    pub webhook_verifier: Arc<SaleWebhookVerifier>,
    pub resolve_cache_ttl: Duration,
}

impl ReferralAppState {
    /// Create handlers on demand from the shared state.
    pub fn issue_code_handler(&self) -> IssueCodeHandler {
        IssueCodeHandler::new(self.accounts.clone(), self.schedule.clone())
    }

    pub fn resolve_code_handler(&self) -> Arc<ResolveCodeHandler> {
        Arc::new(ResolveCodeHandler::new(
            self.accounts.clone(),
            self.resolve_cache.clone(),
            self.resolve_cache_ttl,
        ))
    }

    pub fn track_visit_handler(&self) -> TrackVisitHandler {
        TrackVisitHandler::new(self.resolve_code_handler(), self.attributions.clone())
    }

    pub fn record_sale_handler(&self) -> RecordSaleHandler {
        RecordSaleHandler::new(
            self.accounts.clone(),
            self.ledger.clone(),
            self.notifier.clone(),
            self.schedule.clone(),
        )
    }

    pub fn dashboard_handler(&self) -> AccountDashboardHandler {
        AccountDashboardHandler::new(
            self.accounts.clone(),
            self.ledger.clone(),
            self.schedule.clone(),
        )
    }

    pub fn deactivate_account_handler(&self) -> DeactivateAccountHandler {
        DeactivateAccountHandler::new(self.accounts.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error mapping
// ════════════════════════════════════════════════════════════════════════════════

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed
        | ErrorCode::EmptyField
        | ErrorCode::OutOfRange
        | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
        ErrorCode::ReferralNotFound | ErrorCode::AccountNotFound | ErrorCode::EntryNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::DuplicateAccount | ErrorCode::DuplicateReferralCode => StatusCode::CONFLICT,
        ErrorCode::ReferralInactive => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn registry_error(err: RegistryError) -> (StatusCode, Json<ErrorResponse>) {
    (
        status_for(err.code()),
        Json(ErrorResponse::new(err.code().to_string(), err.message())),
    )
}

fn attribution_error(err: AttributionError) -> (StatusCode, Json<ErrorResponse>) {
    (
        status_for(err.code()),
        Json(ErrorResponse::new(err.code().to_string(), err.to_string())),
    )
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /referrals - enroll an owner, issuing their code.
pub async fn issue_code(
    State(state): State<ReferralAppState>,
    Json(request): Json<IssueCodeRequest>,
) -> impl IntoResponse {
    let owner_id = match OwnerId::new(request.owner_id) {
        Ok(owner_id) => owner_id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("VALIDATION_FAILED", e.to_string())),
            )
                .into_response()
        }
    };

    match state
        .issue_code_handler()
        .handle(IssueCodeCommand { owner_id })
        .await
    {
        Ok(account) => (StatusCode::CREATED, Json(AccountResponse::from(&account))).into_response(),
        Err(e) => registry_error(e).into_response(),
    }
}

/// GET /referrals/:code - resolve a referral code.
pub async fn resolve_code(
    State(state): State<ReferralAppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let code = match ReferralCode::parse(code) {
        Ok(code) => code,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("VALIDATION_FAILED", e.to_string())),
            )
                .into_response()
        }
    };

    match state.resolve_code_handler().handle(&code).await {
        Ok(account) => (StatusCode::OK, Json(AccountResponse::from(&account))).into_response(),
        Err(e) => registry_error(e).into_response(),
    }
}

/// POST /track - record a referred visit.
pub async fn track_visit(
    State(state): State<ReferralAppState>,
    Json(request): Json<TrackVisitRequest>,
) -> impl IntoResponse {
    let (referral_code, visitor) = request.into_parts();
    match state
        .track_visit_handler()
        .handle(TrackVisitCommand {
            referral_code,
            visitor,
        })
        .await
    {
        Ok(attribution_id) => (
            StatusCode::CREATED,
            Json(TrackVisitResponse {
                attribution_id: attribution_id.to_string(),
            }),
        )
            .into_response(),
        Err(e) => attribution_error(e).into_response(),
    }
}

/// GET /accounts/:owner_id/dashboard - referrer dashboard rollup.
pub async fn get_dashboard(
    State(state): State<ReferralAppState>,
    Path(owner_id): Path<String>,
) -> impl IntoResponse {
    let owner_id = match OwnerId::new(owner_id) {
        Ok(owner_id) => owner_id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("VALIDATION_FAILED", e.to_string())),
            )
                .into_response()
        }
    };

    match state.dashboard_handler().handle(&owner_id).await {
        Ok(view) => (StatusCode::OK, Json(DashboardResponse::from(view))).into_response(),
        Err(e) => registry_error(e).into_response(),
    }
}

/// POST /accounts/:owner_id/deactivate - opt a referrer out.
pub async fn deactivate_account(
    State(state): State<ReferralAppState>,
    Path(owner_id): Path<String>,
) -> impl IntoResponse {
    let owner_id = match OwnerId::new(owner_id) {
        Ok(owner_id) => owner_id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("VALIDATION_FAILED", e.to_string())),
            )
                .into_response()
        }
    };

    match state.deactivate_account_handler().handle(&owner_id).await {
        Ok(account) => (StatusCode::OK, Json(AccountResponse::from(&account))).into_response(),
        Err(e) => registry_error(e).into_response(),
    }
}

/// POST /webhooks/sales - ingest one sale event.
///
/// The body is consumed raw so the signature covers exactly the delivered
/// bytes. Replies 200 for anything the source should not retry (recorded,
/// replayed, or valid-but-uncommissioned sales), 401 for bad signatures,
/// 400 for malformed payloads, and 5xx when a retry can help.
pub async fn ingest_sale_event(
    State(state): State<ReferralAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(signature) => signature,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("MISSING_SIGNATURE", "signature required")),
            )
                .into_response()
        }
    };

    let now_unix = Timestamp::now().as_unix_secs() as i64;
    if let Err(e) = state.webhook_verifier.verify(&body, signature, now_unix) {
        tracing::warn!(error = %e, "sale webhook signature rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("INVALID_SIGNATURE", e.to_string())),
        )
            .into_response();
    }

    let payload: SaleEventPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("MALFORMED_PAYLOAD", e.to_string())),
            )
                .into_response()
        }
    };

    let result = state
        .record_sale_handler()
        .handle(RecordSaleCommand {
            sale_reference: payload.sale_reference,
            referral_code: payload.referral_code,
            sale_amount_minor: payload.sale_amount_minor,
        })
        .await;

    match result {
        Ok(result) => (
            StatusCode::OK,
            Json(SaleEventResponse::commissioned(&result.entry, result.replayed)),
        )
            .into_response(),
        // The sale stays valid; acknowledge so the source stops retrying.
        Err(LedgerError::UnknownReferral(code)) => {
            tracing::info!(referral_code = %code, "sale without resolvable referral");
            (StatusCode::OK, Json(SaleEventResponse::not_commissioned())).into_response()
        }
        Err(LedgerError::ReferralInactive(code)) => {
            tracing::info!(referral_code = %code, "sale for deactivated referral");
            (StatusCode::OK, Json(SaleEventResponse::not_commissioned())).into_response()
        }
        Err(e @ LedgerError::InvalidAmount { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e.code().to_string(), e.message())),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.code().to_string(), e.message())),
        )
            .into_response(),
    }
}
