//! Repository for the `jobs` and `job_skill_requirements` tables.

use shiftline_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::{CreateJob, Job, JobSkillRequirement, JobStatus};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, account_id, title, location, start_time, end_time, \
    required_headcount, notes, status, created_at, updated_at";

pub struct JobRepo;

impl JobRepo {
    pub async fn create(
        pool: &PgPool,
        account_id: DbId,
        input: &CreateJob,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (account_id, title, location, start_time, end_time, \
             required_headcount, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(account_id)
            .bind(&input.title)
            .bind(&input.location)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.required_headcount)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The liveness check used before each deferred batch: the job must still
    /// exist and still be open.
    pub async fn get_open(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 AND status = $2");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Open.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: JobStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Structured skill quotas in declaration order.
    pub async fn skill_requirements(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<JobSkillRequirement>, sqlx::Error> {
        sqlx::query_as::<_, JobSkillRequirement>(
            "SELECT id, job_id, skill, headcount, position \
             FROM job_skill_requirements \
             WHERE job_id = $1 \
             ORDER BY position ASC, id ASC",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await
    }

    pub async fn add_skill_requirement(
        pool: &PgPool,
        job_id: DbId,
        skill: &str,
        headcount: i32,
        position: i32,
    ) -> Result<JobSkillRequirement, sqlx::Error> {
        sqlx::query_as::<_, JobSkillRequirement>(
            "INSERT INTO job_skill_requirements (job_id, skill, headcount, position) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, job_id, skill, headcount, position",
        )
        .bind(job_id)
        .bind(skill)
        .bind(headcount)
        .bind(position)
        .fetch_one(pool)
        .await
    }
}
