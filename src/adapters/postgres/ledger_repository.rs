//! PostgreSQL implementation of LedgerRepository.
//!
//! The claim step leans on row-at-a-time `UPDATE ... WHERE state =
//! 'pending'`: two overlapping cycles can both run it, but a row only
//! matches the predicate once, so each entry is claimed exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CommissionRate, DomainError, ErrorCode, LedgerEntryId, Money, ReferralAccountId,
    SaleReference, Timestamp,
};
use crate::domain::ledger::{CommissionLedgerEntry, EntryState, RetryDisposition};
use crate::ports::{CommissionSummary, InsertEntryOutcome, LedgerRepository};

/// PostgreSQL implementation of the LedgerRepository port.
pub struct PostgresLedgerRepository {
    pool: PgPool,
}

impl PostgresLedgerRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    account_id: Uuid,
    sale_reference: String,
    sale_amount: i64,
    rate_applied: Decimal,
    commission_amount: i64,
    state: String,
    retry_count: i32,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
    transfer_id: Option<String>,
}

const SELECT_COLUMNS: &str = "id, account_id, sale_reference, sale_amount, rate_applied, \
     commission_amount, state, retry_count, created_at, settled_at, transfer_id";

impl TryFrom<EntryRow> for CommissionLedgerEntry {
    type Error = DomainError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(CommissionLedgerEntry {
            id: LedgerEntryId::from_uuid(row.id),
            account_id: ReferralAccountId::from_uuid(row.account_id),
            sale_reference: SaleReference::new(row.sale_reference)?,
            sale_amount: Money::from_minor_units(row.sale_amount)?,
            rate_applied: CommissionRate::new(row.rate_applied)?,
            commission_amount: Money::from_minor_units(row.commission_amount)?,
            state: parse_state(&row.state)?,
            retry_count: row.retry_count.max(0) as u32,
            created_at: Timestamp::from_datetime(row.created_at),
            settled_at: row.settled_at.map(Timestamp::from_datetime),
            transfer_id: row.transfer_id,
        })
    }
}

fn parse_state(s: &str) -> Result<EntryState, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(EntryState::Pending),
        "scheduled" => Ok(EntryState::Scheduled),
        "settled" => Ok(EntryState::Settled),
        "failed" => Ok(EntryState::Failed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid entry state: {}", s),
        )),
    }
}

fn db_error(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn insert(
        &self,
        entry: &CommissionLedgerEntry,
    ) -> Result<InsertEntryOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO commission_entries (
                id, account_id, sale_reference, sale_amount, rate_applied,
                commission_amount, state, retry_count, created_at, settled_at, transfer_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.account_id.as_uuid())
        .bind(entry.sale_reference.as_str())
        .bind(entry.sale_amount.minor_units())
        .bind(entry.rate_applied.as_decimal())
        .bind(entry.commission_amount.minor_units())
        .bind(entry.state.to_string())
        .bind(entry.retry_count as i32)
        .bind(entry.created_at.as_datetime())
        .bind(entry.settled_at.map(|t| *t.as_datetime()))
        .bind(&entry.transfer_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertEntryOutcome::Inserted),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("commission_entries_sale_reference_key") =>
            {
                let existing = self
                    .find_by_sale_reference(&entry.sale_reference)
                    .await?
                    .ok_or_else(|| db_error("duplicate reference vanished", "no row"))?;
                Ok(InsertEntryOutcome::DuplicateSaleReference(existing))
            }
            Err(e) => Err(db_error("Failed to insert entry", e)),
        }
    }

    async fn find_by_sale_reference(
        &self,
        reference: &SaleReference,
    ) -> Result<Option<CommissionLedgerEntry>, DomainError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM commission_entries WHERE sale_reference = $1",
            SELECT_COLUMNS
        ))
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find entry", e))?;

        row.map(CommissionLedgerEntry::try_from).transpose()
    }

    async fn find_by_id(
        &self,
        id: &LedgerEntryId,
    ) -> Result<Option<CommissionLedgerEntry>, DomainError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM commission_entries WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find entry", e))?;

        row.map(CommissionLedgerEntry::try_from).transpose()
    }

    async fn claim_due(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<CommissionLedgerEntry>, DomainError> {
        // The state predicate makes each row's transition atomic: a row
        // already claimed by a concurrent cycle no longer matches.
        sqlx::query(
            r#"
            UPDATE commission_entries
            SET state = 'scheduled'
            WHERE state = 'pending' AND created_at <= $1
            "#,
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to claim entries", e))?;

        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM commission_entries WHERE state = 'scheduled' ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load scheduled entries", e))?;

        rows.into_iter()
            .map(CommissionLedgerEntry::try_from)
            .collect()
    }

    async fn mark_settled(
        &self,
        ids: &[LedgerEntryId],
        transfer_id: &str,
        settled_at: Timestamp,
    ) -> Result<(), DomainError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let result = sqlx::query(
            r#"
            UPDATE commission_entries
            SET state = 'settled', settled_at = $2, transfer_id = $3
            WHERE id = ANY($1) AND state = 'scheduled'
            "#,
        )
        .bind(&uuids)
        .bind(settled_at.as_datetime())
        .bind(transfer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to settle entries", e))?;

        if result.rows_affected() != ids.len() as u64 {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "settled {} of {} entries; group was not fully scheduled",
                    result.rows_affected(),
                    ids.len()
                ),
            ));
        }
        Ok(())
    }

    async fn release_for_retry(
        &self,
        ids: &[LedgerEntryId],
        max_retries: u32,
    ) -> Result<Vec<(LedgerEntryId, RetryDisposition)>, DomainError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            UPDATE commission_entries
            SET retry_count = retry_count + 1,
                state = CASE WHEN retry_count + 1 >= $2 THEN 'failed' ELSE 'pending' END
            WHERE id = ANY($1) AND state = 'scheduled'
            RETURNING id, state
            "#,
        )
        .bind(&uuids)
        .bind(max_retries as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to release entries", e))?;

        rows.into_iter()
            .map(|(id, state)| {
                let disposition = match parse_state(&state)? {
                    EntryState::Failed => RetryDisposition::Exhausted,
                    _ => RetryDisposition::Requeued,
                };
                Ok((LedgerEntryId::from_uuid(id), disposition))
            })
            .collect()
    }

    async fn account_summary(
        &self,
        account_id: &ReferralAccountId,
    ) -> Result<CommissionSummary, DomainError> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(commission_amount) FILTER (WHERE state = 'settled'), 0)::BIGINT,
                COALESCE(SUM(commission_amount) FILTER (WHERE state IN ('pending', 'scheduled')), 0)::BIGINT,
                COALESCE(SUM(commission_amount) FILTER (WHERE state = 'failed'), 0)::BIGINT
            FROM commission_entries
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to summarize entries", e))?;

        let (total_entries, settled, outstanding, failed) = row;
        let settled = Money::from_minor_units(settled)?;
        let outstanding = Money::from_minor_units(outstanding)?;
        let earned = settled.checked_add(outstanding).ok_or_else(|| {
            DomainError::new(ErrorCode::InvariantViolation, "summary overflow")
        })?;

        Ok(CommissionSummary {
            total_entries: total_entries.max(0) as u64,
            total_earned: earned,
            total_settled: settled,
            outstanding,
            failed: Money::from_minor_units(failed)?,
        })
    }
}
