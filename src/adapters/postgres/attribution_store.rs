//! PostgreSQL implementation of AttributionStore.
//!
//! Visitor context is stored as JSONB; attribution is analytics-only and
//! never joins the money path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::attribution::{AttributionRecord, VisitorContext};
use crate::domain::foundation::{
    AttributionId, DomainError, ErrorCode, ReferralAccountId, Timestamp,
};
use crate::domain::registry::ReferralCode;
use crate::ports::AttributionStore;

/// PostgreSQL implementation of the AttributionStore port.
pub struct PostgresAttributionStore {
    pool: PgPool,
}

impl PostgresAttributionStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttributionRow {
    id: Uuid,
    referral_code: String,
    account_id: Uuid,
    visitor: serde_json::Value,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<AttributionRow> for AttributionRecord {
    type Error = DomainError;

    fn try_from(row: AttributionRow) -> Result<Self, Self::Error> {
        let visitor: VisitorContext = serde_json::from_value(row.visitor).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid visitor payload: {}", e),
            )
        })?;
        Ok(AttributionRecord {
            id: AttributionId::from_uuid(row.id),
            referral_code: ReferralCode::parse(row.referral_code)?,
            account_id: ReferralAccountId::from_uuid(row.account_id),
            visitor,
            occurred_at: Timestamp::from_datetime(row.occurred_at),
        })
    }
}

fn db_error(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl AttributionStore for PostgresAttributionStore {
    async fn append(&self, record: &AttributionRecord) -> Result<(), DomainError> {
        let visitor = serde_json::to_value(&record.visitor).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to encode visitor: {}", e),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO attribution_records (id, referral_code, account_id, visitor, occurred_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.referral_code.as_str())
        .bind(record.account_id.as_uuid())
        .bind(visitor)
        .bind(record.occurred_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to append attribution", e))?;

        Ok(())
    }

    async fn recent_for_account(
        &self,
        account_id: &ReferralAccountId,
        limit: u32,
    ) -> Result<Vec<AttributionRecord>, DomainError> {
        let rows: Vec<AttributionRow> = sqlx::query_as(
            r#"
            SELECT id, referral_code, account_id, visitor, occurred_at
            FROM attribution_records
            WHERE account_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load attributions", e))?;

        rows.into_iter().map(AttributionRecord::try_from).collect()
    }
}
