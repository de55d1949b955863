//! Repository for the `messages` table.

use shiftline_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{CreateMessage, Message};

/// Column list for `messages` queries.
const COLUMNS: &str = "\
    id, account_id, campaign_id, contact_id, channel, body, status, \
    provider_message_id, error, created_at";

/// `messages.status` values.
const STATUS_SENT: &str = "sent";
const STATUS_FAILED: &str = "failed";

pub struct MessageRepo;

impl MessageRepo {
    pub async fn create(pool: &PgPool, input: &CreateMessage) -> Result<Message, sqlx::Error> {
        let status = if input.sent { STATUS_SENT } else { STATUS_FAILED };
        let query = format!(
            "INSERT INTO messages \
             (account_id, campaign_id, contact_id, channel, body, status, \
              provider_message_id, error) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.account_id)
            .bind(input.campaign_id)
            .bind(input.contact_id)
            .bind(input.channel.as_str())
            .bind(&input.body)
            .bind(status)
            .bind(&input.provider_message_id)
            .bind(&input.error)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages WHERE campaign_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(campaign_id)
            .fetch_all(pool)
            .await
    }
}
