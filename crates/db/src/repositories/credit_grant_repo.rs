//! Repository for the `credit_grants` table.
//!
//! Debit and refund mutations run on an explicit connection so the ledger can
//! wrap them in one transaction with the `FOR UPDATE` balance read; nothing
//! here commits anything.

use shiftline_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::credit::{CreditGrant, GrantSourceType};

/// Column list for `credit_grants` queries.
const COLUMNS: &str = "\
    id, account_id, source_type, source_ref, credits_granted, \
    credits_consumed, credits_remaining, expires_at, created_at";

pub struct CreditGrantRepo;

impl CreditGrantRepo {
    /// Insert a grant. Runs on an explicit connection so the caller can pair
    /// it with the matching positive ledger transaction in one commit.
    pub async fn create(
        conn: &mut PgConnection,
        account_id: DbId,
        source_type: GrantSourceType,
        amount: i64,
        source_ref: Option<&str>,
        expires_at: Option<Timestamp>,
    ) -> Result<CreditGrant, sqlx::Error> {
        let query = format!(
            "INSERT INTO credit_grants \
             (account_id, source_type, source_ref, credits_granted, credits_remaining, expires_at) \
             VALUES ($1, $2, $3, $4, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CreditGrant>(&query)
            .bind(account_id)
            .bind(source_type.as_str())
            .bind(source_ref)
            .bind(amount)
            .bind(expires_at)
            .fetch_one(conn)
            .await
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<CreditGrant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM credit_grants WHERE id = $1");
        sqlx::query_as::<_, CreditGrant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock and return the account's unexpired, non-empty grants in
    /// consumption order: soonest expiry first, non-expiring last, creation
    /// order as tie-break.
    pub async fn lock_live_for_account(
        conn: &mut PgConnection,
        account_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<CreditGrant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM credit_grants \
             WHERE account_id = $1 \
               AND credits_remaining > 0 \
               AND (expires_at IS NULL OR expires_at > $2) \
             ORDER BY expires_at ASC NULLS LAST, id ASC \
             FOR UPDATE"
        );
        sqlx::query_as::<_, CreditGrant>(&query)
            .bind(account_id)
            .bind(now)
            .fetch_all(conn)
            .await
    }

    /// Move `amount` credits from remaining to consumed on one grant.
    pub async fn apply_debit(
        conn: &mut PgConnection,
        grant_id: DbId,
        amount: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE credit_grants \
             SET credits_remaining = credits_remaining - $2, \
                 credits_consumed = credits_consumed + $2 \
             WHERE id = $1",
        )
        .bind(grant_id)
        .bind(amount)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Move `amount` credits back from consumed to remaining on one grant.
    pub async fn apply_refund(
        conn: &mut PgConnection,
        grant_id: DbId,
        amount: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE credit_grants \
             SET credits_remaining = credits_remaining + $2, \
                 credits_consumed = credits_consumed - $2 \
             WHERE id = $1",
        )
        .bind(grant_id)
        .bind(amount)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Sum of `credits_remaining` across the account's unexpired grants.
    pub async fn available(
        pool: &PgPool,
        account_id: DbId,
        now: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(credits_remaining), 0)::BIGINT FROM credit_grants \
             WHERE account_id = $1 \
               AND (expires_at IS NULL OR expires_at > $2)",
        )
        .bind(account_id)
        .bind(now)
        .fetch_one(pool)
        .await?;
        Ok(total)
    }
}
