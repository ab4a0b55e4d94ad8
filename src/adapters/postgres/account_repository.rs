//! PostgreSQL implementation of AccountRepository.
//!
//! Uniqueness rides on the table's constraints; the qualifying-sale path
//! runs inside one transaction with a `FOR UPDATE` row lock plus an insert
//! into `qualifying_sales`, which together give per-account serialization
//! and per-sale idempotency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CommissionRate, DomainError, ErrorCode, Money, OwnerId, ReferralAccountId, SaleReference,
    Timestamp,
};
use crate::domain::registry::{AccountStatus, ReferralAccount, ReferralCode};
use crate::domain::tiers::{Tier, TierSchedule};
use crate::ports::{AccountRepository, InsertAccountOutcome, QualifyingSaleOutcome};

/// PostgreSQL implementation of the AccountRepository port.
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a referral account.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    owner_id: String,
    referral_code: String,
    current_rate: Decimal,
    tier: String,
    lifetime_qualifying_sales: i64,
    lifetime_referral_count: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = "id, owner_id, referral_code, current_rate, tier, \
     lifetime_qualifying_sales, lifetime_referral_count, status, created_at, updated_at";

impl TryFrom<AccountRow> for ReferralAccount {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(ReferralAccount {
            id: ReferralAccountId::from_uuid(row.id),
            owner_id: OwnerId::new(row.owner_id)?,
            referral_code: ReferralCode::parse(row.referral_code)?,
            current_rate: CommissionRate::new(row.current_rate)?,
            tier: parse_tier(&row.tier)?,
            lifetime_qualifying_sales: Money::from_minor_units(row.lifetime_qualifying_sales)?,
            lifetime_referral_count: row.lifetime_referral_count.max(0) as u64,
            status: parse_status(&row.status)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_tier(s: &str) -> Result<Tier, DomainError> {
    match s.to_lowercase().as_str() {
        "bronze" => Ok(Tier::Bronze),
        "silver" => Ok(Tier::Silver),
        "gold" => Ok(Tier::Gold),
        "platinum" => Ok(Tier::Platinum),
        "diamond" => Ok(Tier::Diamond),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid tier value: {}", s),
        )),
    }
}

fn tier_to_string(tier: &Tier) -> &'static str {
    match tier {
        Tier::Bronze => "bronze",
        Tier::Silver => "silver",
        Tier::Gold => "gold",
        Tier::Platinum => "platinum",
        Tier::Diamond => "diamond",
    }
}

fn parse_status(s: &str) -> Result<AccountStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "active" => Ok(AccountStatus::Active),
        "deactivated" => Ok(AccountStatus::Deactivated),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn status_to_string(status: &AccountStatus) -> &'static str {
    match status {
        AccountStatus::Active => "active",
        AccountStatus::Deactivated => "deactivated",
    }
}

fn db_error(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn insert(
        &self,
        account: &ReferralAccount,
    ) -> Result<InsertAccountOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO referral_accounts (
                id, owner_id, referral_code, current_rate, tier,
                lifetime_qualifying_sales, lifetime_referral_count, status,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.owner_id.as_str())
        .bind(account.referral_code.as_str())
        .bind(account.current_rate.as_decimal())
        .bind(tier_to_string(&account.tier))
        .bind(account.lifetime_qualifying_sales.minor_units())
        .bind(account.lifetime_referral_count as i64)
        .bind(status_to_string(&account.status))
        .bind(account.created_at.as_datetime())
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertAccountOutcome::Inserted),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("referral_accounts_owner_id_key") =>
            {
                let existing = self
                    .find_by_owner(&account.owner_id)
                    .await?
                    .ok_or_else(|| db_error("duplicate owner vanished", "no row"))?;
                Ok(InsertAccountOutcome::DuplicateOwner(existing))
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("referral_accounts_referral_code_key") =>
            {
                Ok(InsertAccountOutcome::DuplicateCode)
            }
            Err(e) => Err(db_error("Failed to insert account", e)),
        }
    }

    async fn find_by_owner(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM referral_accounts WHERE owner_id = $1",
            SELECT_COLUMNS
        ))
        .bind(owner_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find account", e))?;

        row.map(ReferralAccount::try_from).transpose()
    }

    async fn find_by_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM referral_accounts WHERE referral_code = $1",
            SELECT_COLUMNS
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find account", e))?;

        row.map(ReferralAccount::try_from).transpose()
    }

    async fn find_by_id(
        &self,
        id: &ReferralAccountId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM referral_accounts WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find account", e))?;

        row.map(ReferralAccount::try_from).transpose()
    }

    async fn current_rate(
        &self,
        id: &ReferralAccountId,
    ) -> Result<Option<CommissionRate>, DomainError> {
        let rate: Option<Decimal> =
            sqlx::query_scalar("SELECT current_rate FROM referral_accounts WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to read rate", e))?;

        rate.map(CommissionRate::new)
            .transpose()
            .map_err(DomainError::from)
    }

    async fn apply_qualifying_sale(
        &self,
        id: &ReferralAccountId,
        sale_reference: &SaleReference,
        amount: Money,
        schedule: &TierSchedule,
    ) -> Result<QualifyingSaleOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // Dedup first: at-least-once delivery must count each sale once.
        let dedup = sqlx::query(
            r#"
            INSERT INTO qualifying_sales (account_id, sale_reference)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id.as_uuid())
        .bind(sale_reference.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to record qualifying sale", e))?;

        if dedup.rows_affected() == 0 {
            return Ok(QualifyingSaleOutcome::AlreadyCounted);
        }

        // Row lock serializes concurrent sales for this account; the
        // counter update and tier recompute commit as one unit.
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM referral_accounts WHERE id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock account", e))?;

        let mut account = match row {
            Some(row) => ReferralAccount::try_from(row)?,
            None => return Ok(QualifyingSaleOutcome::AccountNotFound),
        };

        let upgrade = account.apply_qualifying_sale(amount, schedule)?;

        sqlx::query(
            r#"
            UPDATE referral_accounts SET
                current_rate = $2,
                tier = $3,
                lifetime_qualifying_sales = $4,
                lifetime_referral_count = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.current_rate.as_decimal())
        .bind(tier_to_string(&account.tier))
        .bind(account.lifetime_qualifying_sales.minor_units())
        .bind(account.lifetime_referral_count as i64)
        .bind(account.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update account", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit qualifying sale", e))?;

        Ok(QualifyingSaleOutcome::Applied { account, upgrade })
    }

    async fn deactivate(&self, id: &ReferralAccountId) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE referral_accounts SET status = 'deactivated', updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to deactivate account", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_roundtrips_through_strings() {
        for tier in Tier::all() {
            assert_eq!(parse_tier(tier_to_string(&tier)).unwrap(), tier);
        }
    }

    #[test]
    fn parse_tier_rejects_unknown_values() {
        assert!(parse_tier("copper").is_err());
        assert!(parse_tier("").is_err());
    }

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [AccountStatus::Active, AccountStatus::Deactivated] {
            assert_eq!(parse_status(status_to_string(&status)).unwrap(), status);
        }
    }

    #[test]
    fn parse_status_is_case_insensitive() {
        assert_eq!(parse_status("ACTIVE").unwrap(), AccountStatus::Active);
    }
}
