//! Repository for the `credit_transactions` ledger table.
//!
//! Rows are append-only. The single permitted mutation is the one-time
//! `refunded_at` stamp, which is what makes a second refund of the same
//! debit detectable.

use shiftline_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::credit::CreditTransaction;

/// Column list for `credit_transactions` queries.
const COLUMNS: &str = "\
    id, grant_id, account_id, delta, reason, message_id, refunded_at, created_at";

pub struct CreditTransactionRepo;

impl CreditTransactionRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        grant_id: DbId,
        account_id: DbId,
        delta: i64,
        reason: &str,
        message_id: Option<DbId>,
    ) -> Result<CreditTransaction, sqlx::Error> {
        let query = format!(
            "INSERT INTO credit_transactions (grant_id, account_id, delta, reason, message_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(grant_id)
            .bind(account_id)
            .bind(delta)
            .bind(reason)
            .bind(message_id)
            .fetch_one(conn)
            .await
    }

    /// Lock one transaction row for refund validation.
    pub async fn lock(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<CreditTransaction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM credit_transactions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Stamp a debit as refunded. Returns false if it was already stamped,
    /// which callers must treat as a refused double refund.
    pub async fn mark_refunded(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE credit_transactions SET refunded_at = NOW() \
             WHERE id = $1 AND refunded_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list_for_account(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Vec<CreditTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM credit_transactions \
             WHERE account_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(account_id)
            .fetch_all(pool)
            .await
    }
}
