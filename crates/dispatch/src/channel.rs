//! Per-contact channel routing: portal, push with SMS fallback, or SMS.
//!
//! Routing order is cheapest-first. A contact with portal access gets a free
//! in-app message. A contact with registered devices gets a push, with an SMS
//! fallback scheduled for the grace window in case the push is never opened.
//! Everyone else gets a straight SMS. Provider failures are recorded as
//! failed messages and the batch keeps going; only database errors abort.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use shiftline_core::phone::to_e164;
use shiftline_core::types::DbId;
use shiftline_db::models::message::event_types;
use shiftline_db::models::{Contact, CreateMessage, MessageChannel};
use shiftline_db::repositories::{MessageLogRepo, MessageRepo, PushDeliveryRepo};
use shiftline_db::DbPool;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::providers::{PushClient, SmsClient};

/// How a single contact ended up being reached (or not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Free in-app delivery; no credits spent.
    Portal,
    /// Push accepted by the provider; SMS fallback scheduled.
    Push,
    /// SMS handed to the gateway.
    Sms,
    /// All channels failed; recorded, no retry here.
    Failed,
}

pub struct DeliveryChannelRouter {
    pool: DbPool,
    sms: Arc<dyn SmsClient>,
    push: Arc<dyn PushClient>,
    fallback_grace: std::time::Duration,
}

impl DeliveryChannelRouter {
    pub fn new(
        pool: DbPool,
        sms: Arc<dyn SmsClient>,
        push: Arc<dyn PushClient>,
        fallback_grace: std::time::Duration,
    ) -> Self {
        Self {
            pool,
            sms,
            push,
            fallback_grace,
        }
    }

    /// Deliver one message to one contact over the best available channel.
    pub async fn deliver(
        &self,
        contact: &Contact,
        campaign_id: Option<DbId>,
        title: &str,
        body: &str,
    ) -> Result<DeliveryOutcome, DispatchError> {
        if contact.can_log_in {
            return self.send_portal(contact, campaign_id, body).await;
        }
        if !contact.device_tokens.is_empty() {
            match self.send_push(contact, campaign_id, title, body).await? {
                Some(outcome) => return Ok(outcome),
                // Push rejected outright; fall through to SMS.
                None => {}
            }
        }
        self.send_sms(contact, campaign_id, body).await
    }

    async fn send_portal(
        &self,
        contact: &Contact,
        campaign_id: Option<DbId>,
        body: &str,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let event_id = Uuid::new_v4();
        MessageLogRepo::append(
            &self.pool,
            event_id,
            contact.account_id,
            campaign_id,
            Some(contact.id),
            event_types::PORTAL_ATTEMPTED,
            json!({}),
        )
        .await?;
        MessageRepo::create(
            &self.pool,
            &CreateMessage {
                account_id: contact.account_id,
                campaign_id,
                contact_id: contact.id,
                channel: MessageChannel::Portal,
                body: body.to_string(),
                sent: true,
                provider_message_id: None,
                error: None,
            },
        )
        .await?;
        MessageLogRepo::record_terminal(&self.pool, event_id, event_types::PORTAL_SENT, json!({}))
            .await?;
        Ok(DeliveryOutcome::Portal)
    }

    /// Attempt push delivery. `Ok(None)` means the provider rejected every
    /// token and the caller should fall back to SMS immediately.
    async fn send_push(
        &self,
        contact: &Contact,
        campaign_id: Option<DbId>,
        title: &str,
        body: &str,
    ) -> Result<Option<DeliveryOutcome>, DispatchError> {
        let event_id = Uuid::new_v4();
        MessageLogRepo::append(
            &self.pool,
            event_id,
            contact.account_id,
            campaign_id,
            Some(contact.id),
            event_types::PUSH_ATTEMPTED,
            json!({ "devices": contact.device_tokens.len() }),
        )
        .await?;

        let data = json!({ "campaign_id": campaign_id, "contact_id": contact.id });
        let result = match self
            .push
            .send(&contact.device_tokens, title, body, data)
            .await
        {
            Ok(result) if result.success > 0 => result,
            Ok(result) => {
                MessageLogRepo::record_terminal(
                    &self.pool,
                    event_id,
                    event_types::PUSH_FAILED,
                    json!({ "failed_devices": result.failed }),
                )
                .await?;
                return Ok(None);
            }
            Err(err) => {
                warn!(contact_id = contact.id, error = %err, "Push send failed");
                MessageLogRepo::record_terminal(
                    &self.pool,
                    event_id,
                    event_types::PUSH_FAILED,
                    json!({ "error": err.to_string() }),
                )
                .await?;
                return Ok(None);
            }
        };

        MessageRepo::create(
            &self.pool,
            &CreateMessage {
                account_id: contact.account_id,
                campaign_id,
                contact_id: contact.id,
                channel: MessageChannel::Push,
                body: body.to_string(),
                sent: true,
                provider_message_id: result.notification_ids.first().cloned(),
                error: None,
            },
        )
        .await?;

        let fallback_due_at = Utc::now()
            + ChronoDuration::from_std(self.fallback_grace).unwrap_or(ChronoDuration::zero());
        PushDeliveryRepo::create(
            &self.pool,
            contact.account_id,
            campaign_id,
            contact.id,
            result.notification_ids.first().map(String::as_str),
            fallback_due_at,
        )
        .await?;

        MessageLogRepo::record_terminal(
            &self.pool,
            event_id,
            event_types::PUSH_SENT,
            json!({ "devices": result.success }),
        )
        .await?;
        MessageLogRepo::append(
            &self.pool,
            Uuid::new_v4(),
            contact.account_id,
            campaign_id,
            Some(contact.id),
            event_types::SMS_FALLBACK_SCHEDULED,
            json!({ "due_at": fallback_due_at }),
        )
        .await?;

        Ok(Some(DeliveryOutcome::Push))
    }

    /// Send one SMS, logging attempt and terminal outcome on one event id.
    pub async fn send_sms(
        &self,
        contact: &Contact,
        campaign_id: Option<DbId>,
        body: &str,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let event_id = Uuid::new_v4();
        MessageLogRepo::append(
            &self.pool,
            event_id,
            contact.account_id,
            campaign_id,
            Some(contact.id),
            event_types::SMS_ATTEMPTED,
            json!({}),
        )
        .await?;

        let to = match to_e164(&contact.phone_country, &contact.phone_raw) {
            Ok(number) => number,
            Err(err) => {
                let reason = err.to_string();
                self.record_sms_failure(contact, campaign_id, body, event_id, &reason)
                    .await?;
                return Ok(DeliveryOutcome::Failed);
            }
        };

        match self.sms.send(&to, body).await {
            Ok(provider_message_id) => {
                MessageRepo::create(
                    &self.pool,
                    &CreateMessage {
                        account_id: contact.account_id,
                        campaign_id,
                        contact_id: contact.id,
                        channel: MessageChannel::Sms,
                        body: body.to_string(),
                        sent: true,
                        provider_message_id: Some(provider_message_id.clone()),
                        error: None,
                    },
                )
                .await?;
                MessageLogRepo::record_terminal(
                    &self.pool,
                    event_id,
                    event_types::SMS_SENT,
                    json!({ "provider_message_id": provider_message_id }),
                )
                .await?;
                Ok(DeliveryOutcome::Sms)
            }
            Err(err) => {
                warn!(contact_id = contact.id, error = %err, "SMS send failed");
                self.record_sms_failure(contact, campaign_id, body, event_id, &err.to_string())
                    .await?;
                Ok(DeliveryOutcome::Failed)
            }
        }
    }

    async fn record_sms_failure(
        &self,
        contact: &Contact,
        campaign_id: Option<DbId>,
        body: &str,
        event_id: Uuid,
        reason: &str,
    ) -> Result<(), DispatchError> {
        MessageRepo::create(
            &self.pool,
            &CreateMessage {
                account_id: contact.account_id,
                campaign_id,
                contact_id: contact.id,
                channel: MessageChannel::Sms,
                body: body.to_string(),
                sent: false,
                provider_message_id: None,
                error: Some(reason.to_string()),
            },
        )
        .await?;
        MessageLogRepo::record_terminal(
            &self.pool,
            event_id,
            event_types::SMS_FAILED,
            json!({ "error": reason }),
        )
        .await?;
        Ok(())
    }
}
