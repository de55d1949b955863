//! Campaign models: one dispatch run plus its durable deferred batches.

use serde::Serialize;
use shiftline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Legal values of `campaigns.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignKind {
    /// Creates availability records and feeds the replacement pool.
    JobInvitation,
    /// Plain broadcast; no availability side effects.
    Announcement,
}

impl CampaignKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignKind::JobInvitation => "job_invitation",
            CampaignKind::Announcement => "announcement",
        }
    }
}

/// Legal values of `campaigns.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Running,
    /// Queue drained.
    Complete,
    /// Credit budget hit zero with contacts still queued.
    Exhausted,
    /// Required headcount confirmed before the queue drained.
    Fulfilled,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Running => "running",
            CampaignStatus::Complete => "complete",
            CampaignStatus::Exhausted => "exhausted",
            CampaignStatus::Fulfilled => "fulfilled",
            CampaignStatus::Cancelled => "cancelled",
        }
    }
}

/// A row from the `campaigns` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    pub account_id: DbId,
    pub job_id: Option<DbId>,
    pub kind: String,
    pub body: String,
    pub contact_queue: Vec<DbId>,
    pub cursor: i32,
    pub credits_remaining: i64,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Legal values of `campaign_batches.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Running => "running",
            BatchStatus::Done => "done",
            BatchStatus::Failed => "failed",
        }
    }
}

/// A row from `campaign_batches`: one deferred batch, claimable by a worker.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CampaignBatch {
    pub id: DbId,
    pub campaign_id: DbId,
    pub run_after: Timestamp,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
