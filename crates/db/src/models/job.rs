//! Job entity models.

use serde::{Deserialize, Serialize};
use shiftline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Legal values of `jobs.status`. Dispatch liveness checks require `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Open,
    Filled,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Filled => "filled",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub account_id: DbId,
    pub title: String,
    pub location: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub required_headcount: Option<i32>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from `job_skill_requirements`, in declaration order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobSkillRequirement {
    pub id: DbId,
    pub job_id: DbId,
    pub skill: String,
    pub headcount: i32,
    pub position: i32,
}

/// DTO for creating a job.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJob {
    pub title: String,
    pub location: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub required_headcount: Option<i32>,
    pub notes: Option<String>,
}
