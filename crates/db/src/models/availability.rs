//! Availability: the (job, contact) relationship driven by dispatch and
//! inbound replies.

use serde::Serialize;
use shiftline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Legal values of `availabilities.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityStatus {
    NoReply,
    Maybe,
    Confirmed,
    Declined,
    Cancelled,
}

impl AvailabilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityStatus::NoReply => "no_reply",
            AvailabilityStatus::Maybe => "maybe",
            AvailabilityStatus::Confirmed => "confirmed",
            AvailabilityStatus::Declined => "declined",
            AvailabilityStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no_reply" => Some(AvailabilityStatus::NoReply),
            "maybe" => Some(AvailabilityStatus::Maybe),
            "confirmed" => Some(AvailabilityStatus::Confirmed),
            "declined" => Some(AvailabilityStatus::Declined),
            "cancelled" => Some(AvailabilityStatus::Cancelled),
            _ => None,
        }
    }

    /// Statuses still awaiting a decision; the fulfillment sweep declines
    /// these once the job's headcount is met.
    pub const PENDING: [AvailabilityStatus; 2] =
        [AvailabilityStatus::NoReply, AvailabilityStatus::Maybe];
}

/// A row from the `availabilities` table. One row per (job, contact) pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Availability {
    pub id: DbId,
    pub job_id: DbId,
    pub contact_id: DbId,
    pub status: String,
    pub shift_preference: Option<String>,
    pub invited_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
