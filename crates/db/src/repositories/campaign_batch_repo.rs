//! Repository for the `campaign_batches` durable batch queue.
//!
//! Deferred batches are rows, not in-memory timers, so a restart resumes a
//! mid-flight campaign instead of silently dropping it. Workers claim due
//! rows with `FOR UPDATE SKIP LOCKED` to stay safe under multiple instances.

use shiftline_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::campaign::{BatchStatus, CampaignBatch};

/// Column list for `campaign_batches` queries.
const COLUMNS: &str = "\
    id, campaign_id, run_after, status, attempts, last_error, created_at, updated_at";

/// A batch that keeps failing is parked as `failed` after this many claims.
const MAX_ATTEMPTS: i32 = 3;

/// Delay before a failed-but-retryable batch becomes claimable again.
const RETRY_DELAY_SECS: i64 = 60;

/// Age after which a `running` batch is presumed orphaned by a dead worker
/// and becomes claimable again.
const STALE_RUNNING_SECS: i64 = 600;

pub struct CampaignBatchRepo;

impl CampaignBatchRepo {
    /// Schedule the next batch of a campaign.
    pub async fn schedule(
        pool: &PgPool,
        campaign_id: DbId,
        run_after: Timestamp,
    ) -> Result<CampaignBatch, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaign_batches (campaign_id, run_after) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CampaignBatch>(&query)
            .bind(campaign_id)
            .bind(run_after)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the next due pending batch, or a `running` batch
    /// orphaned by a worker that died mid-run (stale past
    /// [`STALE_RUNNING_SECS`] and still under the attempt cap).
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` to prevent double-dispatch when multiple
    /// worker instances are running.
    pub async fn claim_due(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Option<CampaignBatch>, sqlx::Error> {
        let query = format!(
            "UPDATE campaign_batches \
             SET status = $1, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM campaign_batches \
                 WHERE (status = $2 AND run_after <= $3) \
                    OR (status = $1 \
                        AND updated_at <= $3 - make_interval(secs => $4) \
                        AND attempts < $5) \
                 ORDER BY run_after ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CampaignBatch>(&query)
            .bind(BatchStatus::Running.as_str())
            .bind(BatchStatus::Pending.as_str())
            .bind(now)
            .bind(STALE_RUNNING_SECS as f64)
            .bind(MAX_ATTEMPTS)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_done(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaign_batches SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(BatchStatus::Done.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record a failed run. Retryable batches go back to pending with a
    /// short delay; batches out of attempts are parked as failed.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaign_batches \
             SET status = CASE WHEN attempts >= $2 THEN $3 ELSE $4 END, \
                 run_after = NOW() + make_interval(secs => $5), \
                 last_error = $6, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(MAX_ATTEMPTS)
        .bind(BatchStatus::Failed.as_str())
        .bind(BatchStatus::Pending.as_str())
        .bind(RETRY_DELAY_SECS as f64)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Pending batches for one campaign (cancellation sweeps these).
    pub async fn cancel_pending_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM campaign_batches WHERE campaign_id = $1 AND status = $2",
        )
        .bind(campaign_id)
        .bind(BatchStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
