//! Message records, the append-only delivery event log, and push deliveries.

use serde::Serialize;
use shiftline_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// Legal values of `messages.channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageChannel {
    Portal,
    Push,
    Sms,
}

impl MessageChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageChannel::Portal => "portal",
            MessageChannel::Push => "push",
            MessageChannel::Sms => "sms",
        }
    }
}

/// Well-known `message_log.event_type` values.
///
/// These must match the strings delivery reporting filters on.
pub mod event_types {
    pub const SMS_ATTEMPTED: &str = "sms_attempted";
    pub const SMS_SENT: &str = "sms_sent";
    pub const SMS_FAILED: &str = "sms_failed";
    pub const PUSH_ATTEMPTED: &str = "push_attempted";
    pub const PUSH_SENT: &str = "push_sent";
    pub const PUSH_FAILED: &str = "push_failed";
    pub const SMS_FALLBACK_SCHEDULED: &str = "sms_fallback_scheduled";
    pub const PORTAL_ATTEMPTED: &str = "portal_attempted";
    pub const PORTAL_SENT: &str = "portal_sent";
    pub const RESPONSE_RECEIVED: &str = "response_received";
    pub const ACK_SENT: &str = "ack_sent";
    pub const POSITIONS_FILLED_SENT: &str = "positions_filled_sent";
}

/// A row from the `messages` table: the durable content record shown to
/// users in delivery history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub account_id: DbId,
    pub campaign_id: Option<DbId>,
    pub contact_id: DbId,
    pub channel: String,
    pub body: String,
    pub status: String,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for inserting a message record.
#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub account_id: DbId,
    pub campaign_id: Option<DbId>,
    pub contact_id: DbId,
    pub channel: MessageChannel,
    pub body: String,
    pub sent: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

/// A row from the `message_log` event stream.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageLogEntry {
    pub id: DbId,
    pub event_id: Uuid,
    pub account_id: DbId,
    pub campaign_id: Option<DbId>,
    pub contact_id: Option<DbId>,
    pub event_type: String,
    pub detail: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Legal values of `push_deliveries.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDeliveryStatus {
    Sent,
    Delivered,
    FallbackSent,
}

impl PushDeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PushDeliveryStatus::Sent => "sent",
            PushDeliveryStatus::Delivered => "delivered",
            PushDeliveryStatus::FallbackSent => "fallback_sent",
        }
    }
}

/// A row from `push_deliveries`: one push attempt awaiting confirmation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushDelivery {
    pub id: DbId,
    pub account_id: DbId,
    pub campaign_id: Option<DbId>,
    pub contact_id: DbId,
    pub notification_id: Option<String>,
    pub status: String,
    pub fallback_due_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
