//! Repository for the `contacts` table.

use shiftline_core::types::DbId;
use sqlx::PgPool;

use crate::models::contact::{Contact, ContactStatus, CreateContact};

/// Column list for `contacts` queries.
const COLUMNS: &str = "\
    id, account_id, name, phone_country, phone_raw, address, tags, skills, \
    blackout_notes, opted_out, can_log_in, device_tokens, status, \
    created_at, updated_at";

/// Inbound phone matching compares this many trailing digits, which tolerates
/// stored numbers with or without trunk/international prefixes.
const PHONE_SUFFIX_LEN: i32 = 9;

pub struct ContactRepo;

impl ContactRepo {
    pub async fn create(
        pool: &PgPool,
        account_id: DbId,
        input: &CreateContact,
    ) -> Result<Contact, sqlx::Error> {
        let query = format!(
            "INSERT INTO contacts (account_id, name, phone_country, phone_raw, address, \
             tags, skills, blackout_notes, opted_out, can_log_in, device_tokens) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(account_id)
            .bind(&input.name)
            .bind(&input.phone_country)
            .bind(&input.phone_raw)
            .bind(&input.address)
            .bind(&input.tags)
            .bind(&input.skills)
            .bind(&input.blackout_notes)
            .bind(input.opted_out)
            .bind(input.can_log_in)
            .bind(&input.device_tokens)
            .fetch_one(pool)
            .await
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contacts WHERE id = $1");
        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch a set of contacts by id. Order is not guaranteed.
    pub async fn get_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Contact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contacts WHERE id = ANY($1)");
        sqlx::query_as::<_, Contact>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// All of an account's contacts; the replacement-sourcing pool.
    pub async fn list_for_account(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Vec<Contact>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contacts WHERE account_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(account_id)
            .fetch_all(pool)
            .await
    }

    /// Resolve an inbound sender: match on the trailing digits of the stored
    /// number so `+447700900123` finds a contact stored as `07700 900123`.
    pub async fn find_by_phone(
        pool: &PgPool,
        phone: &str,
    ) -> Result<Option<Contact>, sqlx::Error> {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM contacts \
             WHERE RIGHT(regexp_replace(phone_raw, '\\D', '', 'g'), $2) = RIGHT($1, $2) \
             ORDER BY id ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(digits)
            .bind(PHONE_SUFFIX_LEN)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: ContactStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE contacts SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }
}
