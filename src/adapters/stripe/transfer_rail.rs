//! Stripe Transfers implementation of the PaymentRail port.
//!
//! Payouts go out as transfers to connected accounts. Each submission
//! carries the batch key in Stripe's `Idempotency-Key` header (duplicate
//! collapsing) and as the `transfer_group` tag, which is what makes the
//! reconciliation query possible: transfers are listed by group, so a
//! lost response can be recovered without a second submission.
//!
//! # Error classification
//!
//! - reqwest timeout -> outcome unknown, reconcile
//! - 5xx -> outcome unknown, reconcile
//! - 401 -> authentication
//! - other 4xx -> confirmed rejection (`PayoutOutcome::Failed`)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::ports::{PaymentRail, PayoutOutcome, PayoutRequest, RailError};
use crate::domain::ledger::IdempotencyKey;

/// Stripe rail configuration.
#[derive(Clone)]
pub struct StripeRailConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,

    /// Settlement currency for transfers.
    currency: String,

    /// Per-request deadline.
    request_timeout: Duration,
}

impl StripeRailConfig {
    /// Creates a configuration against the live Stripe API.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the API base URL (test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Overrides the settlement currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Overrides the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe Transfers adapter.
pub struct StripeTransferRail {
    config: StripeRailConfig,
    http_client: reqwest::Client,
}

impl StripeTransferRail {
    /// Creates the adapter, building an HTTP client with the configured
    /// deadline.
    pub fn new(config: StripeRailConfig) -> Result<Self, RailError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RailError::network(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn classify_send_error(e: reqwest::Error) -> RailError {
        if e.is_timeout() {
            RailError::timeout(e.to_string())
        } else {
            RailError::network(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeTransfer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeTransferList {
    data: Vec<StripeTransfer>,
}

#[async_trait]
impl PaymentRail for StripeTransferRail {
    async fn submit_payout(&self, request: PayoutRequest) -> Result<PayoutOutcome, RailError> {
        let url = format!("{}/v1/transfers", self.config.api_base_url);

        let amount = request.amount.minor_units().to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", self.config.currency.as_str()),
            ("destination", request.destination.as_str()),
            ("transfer_group", request.idempotency_key.as_str()),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", request.idempotency_key.as_str())
            .form(&params)
            .send()
            .await
            .map_err(Self::classify_send_error)?;

        let status = response.status();
        if status.is_success() {
            let transfer: StripeTransfer = response
                .json()
                .await
                .map_err(|e| RailError::provider(format!("unparseable transfer: {}", e)))?;
            return Ok(PayoutOutcome::Succeeded {
                transfer_id: transfer.id,
            });
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RailError::authentication(body));
        }
        if status.is_server_error() {
            return Err(RailError::unavailable(format!("{}: {}", status, body)));
        }

        tracing::warn!(status = %status, body = %body, "transfer rejected");
        Ok(PayoutOutcome::Failed {
            reason: format!("{}: {}", status, body),
        })
    }

    async fn query_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<PayoutOutcome>, RailError> {
        let url = format!("{}/v1/transfers", self.config.api_base_url);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .query(&[("transfer_group", key.as_str()), ("limit", "1")])
            .send()
            .await
            .map_err(Self::classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(RailError::authentication(body));
            }
            return Err(RailError::provider(format!("{}: {}", status, body)));
        }

        let list: StripeTransferList = response
            .json()
            .await
            .map_err(|e| RailError::provider(format!("unparseable transfer list: {}", e)))?;

        Ok(list.data.into_iter().next().map(|transfer| {
            PayoutOutcome::Succeeded {
                transfer_id: transfer.id,
            }
        }))
    }
}
