//! Contact entity models.

use serde::{Deserialize, Serialize};
use shiftline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Legal values of `contacts.status`, driven by availability transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactStatus {
    Free,
    OnJob,
    OffShift,
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::Free => "free",
            ContactStatus::OnJob => "on_job",
            ContactStatus::OffShift => "off_shift",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(ContactStatus::Free),
            "on_job" => Some(ContactStatus::OnJob),
            "off_shift" => Some(ContactStatus::OffShift),
            _ => None,
        }
    }
}

/// A row from the `contacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contact {
    pub id: DbId,
    pub account_id: DbId,
    pub name: String,
    pub phone_country: String,
    pub phone_raw: String,
    pub address: String,
    pub tags: Vec<String>,
    pub skills: Vec<String>,
    pub blackout_notes: Option<String>,
    pub opted_out: bool,
    pub can_log_in: bool,
    pub device_tokens: Vec<String>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a contact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateContact {
    pub name: String,
    pub phone_country: String,
    pub phone_raw: String,
    pub address: String,
    pub tags: Vec<String>,
    pub skills: Vec<String>,
    pub blackout_notes: Option<String>,
    pub opted_out: bool,
    pub can_log_in: bool,
    pub device_tokens: Vec<String>,
}
