//! Repository for the `availabilities` table.

use shiftline_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::availability::{Availability, AvailabilityStatus};

/// Column list for `availabilities` queries.
const COLUMNS: &str = "\
    id, job_id, contact_id, status, shift_preference, invited_at, \
    created_at, updated_at";

pub struct AvailabilityRepo;

impl AvailabilityRepo {
    /// Upsert the (job, contact) row as an invitation.
    ///
    /// A fresh row starts at `no_reply`; an existing row keeps its status and
    /// only refreshes `invited_at`, so a re-send never clobbers a reply that
    /// already arrived.
    pub async fn upsert_invited(
        pool: &PgPool,
        job_id: DbId,
        contact_id: DbId,
    ) -> Result<Availability, sqlx::Error> {
        let query = format!(
            "INSERT INTO availabilities (job_id, contact_id, status, invited_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (job_id, contact_id) \
             DO UPDATE SET invited_at = NOW(), updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Availability>(&query)
            .bind(job_id)
            .bind(contact_id)
            .bind(AvailabilityStatus::NoReply.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn get(
        pool: &PgPool,
        job_id: DbId,
        contact_id: DbId,
    ) -> Result<Option<Availability>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM availabilities WHERE job_id = $1 AND contact_id = $2");
        sqlx::query_as::<_, Availability>(&query)
            .bind(job_id)
            .bind(contact_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        job_id: DbId,
        contact_id: DbId,
        status: AvailabilityStatus,
        shift_preference: Option<&str>,
    ) -> Result<Option<Availability>, sqlx::Error> {
        let query = format!(
            "UPDATE availabilities \
             SET status = $3, shift_preference = COALESCE($4, shift_preference), \
                 updated_at = NOW() \
             WHERE job_id = $1 AND contact_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Availability>(&query)
            .bind(job_id)
            .bind(contact_id)
            .bind(status.as_str())
            .bind(shift_preference)
            .fetch_optional(pool)
            .await
    }

    /// Number of confirmed contacts for a job; the fulfillment signal.
    pub async fn confirmed_count(pool: &PgPool, job_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM availabilities WHERE job_id = $1 AND status = $2",
        )
        .bind(job_id)
        .bind(AvailabilityStatus::Confirmed.as_str())
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// All rows for a job still awaiting a decision (`no_reply` / `maybe`).
    pub async fn pending_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<Availability>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM availabilities \
             WHERE job_id = $1 AND status = ANY($2) \
             ORDER BY id ASC"
        );
        let pending: Vec<String> = AvailabilityStatus::PENDING
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        sqlx::query_as::<_, Availability>(&query)
            .bind(job_id)
            .bind(&pending)
            .fetch_all(pool)
            .await
    }

    /// Contact ids already invited to a job (the replacement-sourcing pool
    /// exclusion set).
    pub async fn invited_contact_ids(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT contact_id FROM availabilities \
             WHERE job_id = $1 AND invited_at IS NOT NULL",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Which of `contact_ids` hold a CONFIRMED availability on another job
    /// whose interval overlaps `[start_time, end_time]` (closed intervals).
    pub async fn contacts_with_confirmed_conflict(
        pool: &PgPool,
        contact_ids: &[DbId],
        exclude_job_id: DbId,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT DISTINCT a.contact_id \
             FROM availabilities a \
             JOIN jobs j ON j.id = a.job_id \
             WHERE a.contact_id = ANY($1) \
               AND a.status = $2 \
               AND a.job_id <> $3 \
               AND j.start_time <= $5 \
               AND $4 <= j.end_time",
        )
        .bind(contact_ids)
        .bind(AvailabilityStatus::Confirmed.as_str())
        .bind(exclude_job_id)
        .bind(start_time)
        .bind(end_time)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The contact's most recently invited still-open availability; inbound
    /// replies resolve against this row.
    pub async fn latest_open_for_contact(
        pool: &PgPool,
        contact_id: DbId,
    ) -> Result<Option<Availability>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM availabilities \
             WHERE contact_id = $1 AND status = ANY($2) \
             ORDER BY invited_at DESC NULLS LAST, created_at DESC \
             LIMIT 1"
        );
        let pending: Vec<String> = AvailabilityStatus::PENDING
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        sqlx::query_as::<_, Availability>(&query)
            .bind(contact_id)
            .bind(&pending)
            .fetch_optional(pool)
            .await
    }
}
