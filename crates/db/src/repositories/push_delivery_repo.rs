//! Repository for the `push_deliveries` table.

use shiftline_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::message::{PushDelivery, PushDeliveryStatus};

/// Column list for `push_deliveries` queries.
const COLUMNS: &str = "\
    id, account_id, campaign_id, contact_id, notification_id, status, \
    fallback_due_at, created_at, updated_at";

pub struct PushDeliveryRepo;

impl PushDeliveryRepo {
    pub async fn create(
        pool: &PgPool,
        account_id: DbId,
        campaign_id: Option<DbId>,
        contact_id: DbId,
        notification_id: Option<&str>,
        fallback_due_at: Timestamp,
    ) -> Result<PushDelivery, sqlx::Error> {
        let query = format!(
            "INSERT INTO push_deliveries \
             (account_id, campaign_id, contact_id, notification_id, fallback_due_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PushDelivery>(&query)
            .bind(account_id)
            .bind(campaign_id)
            .bind(contact_id)
            .bind(notification_id)
            .bind(fallback_due_at)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_contact(
        pool: &PgPool,
        contact_id: DbId,
    ) -> Result<Vec<PushDelivery>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_deliveries WHERE contact_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, PushDelivery>(&query)
            .bind(contact_id)
            .fetch_all(pool)
            .await
    }

    /// Confirm delivery (provider receipt webhook); stops the SMS fallback.
    pub async fn mark_delivered(
        pool: &PgPool,
        notification_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE push_deliveries SET status = $2, updated_at = NOW() \
             WHERE notification_id = $1 AND status = $3",
        )
        .bind(notification_id)
        .bind(PushDeliveryStatus::Delivered.as_str())
        .bind(PushDeliveryStatus::Sent.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Atomically claim deliveries past their fallback deadline and still
    /// unconfirmed, flipping them to `fallback_sent`.
    ///
    /// `FOR UPDATE SKIP LOCKED` keeps concurrent reconciliation workers from
    /// double-sending the same fallback SMS.
    pub async fn claim_due_fallbacks(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<PushDelivery>, sqlx::Error> {
        let query = format!(
            "UPDATE push_deliveries \
             SET status = $1, updated_at = NOW() \
             WHERE id IN ( \
                 SELECT id FROM push_deliveries \
                 WHERE status = $2 AND fallback_due_at <= $3 \
                 ORDER BY fallback_due_at ASC \
                 LIMIT $4 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PushDelivery>(&query)
            .bind(PushDeliveryStatus::FallbackSent.as_str())
            .bind(PushDeliveryStatus::Sent.as_str())
            .bind(now)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
