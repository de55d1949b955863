//! Repository for the `message_log` append-only event stream.

use shiftline_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::message::MessageLogEntry;

/// Column list for `message_log` queries.
const COLUMNS: &str = "\
    id, event_id, account_id, campaign_id, contact_id, event_type, detail, \
    created_at, updated_at";

pub struct MessageLogRepo;

impl MessageLogRepo {
    /// Append one event row.
    pub async fn append(
        pool: &PgPool,
        event_id: Uuid,
        account_id: DbId,
        campaign_id: Option<DbId>,
        contact_id: Option<DbId>,
        event_type: &str,
        detail: serde_json::Value,
    ) -> Result<MessageLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_log \
             (event_id, account_id, campaign_id, contact_id, event_type, detail) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageLogEntry>(&query)
            .bind(event_id)
            .bind(account_id)
            .bind(campaign_id)
            .bind(contact_id)
            .bind(event_type)
            .bind(detail)
            .fetch_one(pool)
            .await
    }

    /// The one permitted mutation: flip an in-flight event (e.g.
    /// `sms_attempted`) to its terminal type on the same logical event id.
    pub async fn record_terminal(
        pool: &PgPool,
        event_id: Uuid,
        event_type: &str,
        detail: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE message_log \
             SET event_type = $2, detail = detail || $3, updated_at = NOW() \
             WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(event_type)
        .bind(detail)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delivery-report feed for one campaign, oldest first.
    pub async fn list_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<Vec<MessageLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_log WHERE campaign_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, MessageLogEntry>(&query)
            .bind(campaign_id)
            .fetch_all(pool)
            .await
    }

    /// Count events of one type for a campaign (used by tests and reports).
    pub async fn count_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
        event_type: &str,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM message_log WHERE campaign_id = $1 AND event_type = $2",
        )
        .bind(campaign_id)
        .bind(event_type)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
