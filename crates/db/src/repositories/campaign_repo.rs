//! Repository for the `campaigns` table.

use shiftline_core::types::DbId;
use sqlx::PgPool;

use crate::models::campaign::{Campaign, CampaignKind, CampaignStatus};

/// Column list for `campaigns` queries.
const COLUMNS: &str = "\
    id, account_id, job_id, kind, body, contact_queue, cursor, \
    credits_remaining, status, created_at, updated_at";

pub struct CampaignRepo;

impl CampaignRepo {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        pool: &PgPool,
        account_id: DbId,
        job_id: Option<DbId>,
        kind: CampaignKind,
        body: &str,
        contact_queue: &[DbId],
        starting_budget: i64,
    ) -> Result<Campaign, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaigns \
             (account_id, job_id, kind, body, contact_queue, credits_remaining) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(account_id)
            .bind(job_id)
            .bind(kind.as_str())
            .bind(body)
            .bind(contact_queue)
            .bind(starting_budget)
            .fetch_one(pool)
            .await
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaigns WHERE id = $1");
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The most recent campaign for a job, any status. Replacement
    /// invitations reuse its body.
    pub async fn latest_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaigns WHERE job_id = $1 ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Persist a batch's outcome: the advanced cursor and the credits it
    /// actually consumed.
    pub async fn record_batch_result(
        pool: &PgPool,
        id: DbId,
        new_cursor: i32,
        credits_spent: i64,
    ) -> Result<Campaign, sqlx::Error> {
        let query = format!(
            "UPDATE campaigns \
             SET cursor = $2, credits_remaining = credits_remaining - $3, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .bind(new_cursor)
            .bind(credits_spent)
            .fetch_one(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: CampaignStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }
}
