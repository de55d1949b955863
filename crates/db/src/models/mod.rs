//! Row models and DTOs. Status columns are TEXT; the enums here are the
//! single source of the legal values.

pub mod availability;
pub mod campaign;
pub mod contact;
pub mod credit;
pub mod job;
pub mod message;

pub use availability::{Availability, AvailabilityStatus};
pub use campaign::{BatchStatus, Campaign, CampaignBatch, CampaignKind, CampaignStatus};
pub use contact::{Contact, ContactStatus, CreateContact};
pub use credit::{CreditGrant, CreditTransaction, GrantSourceType};
pub use job::{CreateJob, Job, JobSkillRequirement, JobStatus};
pub use message::{
    CreateMessage, Message, MessageChannel, MessageLogEntry, PushDelivery, PushDeliveryStatus,
};

/// A row from the `accounts` table (one per organization).
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Account {
    pub id: shiftline_core::types::DbId,
    pub name: String,
    pub created_at: shiftline_core::types::Timestamp,
}
