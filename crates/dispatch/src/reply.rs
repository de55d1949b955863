//! Inbound reply handling: resolve the sender, classify the text, advance
//! the availability state machine, and run the fulfillment sweep.
//!
//! Replies carry no thread identifier, so a sender is resolved to their most
//! recently invited still-open availability. Unknown senders and senders with
//! nothing open are logged and dropped; an inbound SMS must never error the
//! webhook.

use std::sync::Arc;

use serde_json::json;
use shiftline_core::types::DbId;
use shiftline_core::CoreError;
use shiftline_db::models::message::event_types;
use shiftline_db::models::{
    AvailabilityStatus, Contact, ContactStatus, CreditTransaction, JobStatus,
};
use shiftline_db::repositories::{
    AvailabilityRepo, ContactRepo, JobRepo, MessageLogRepo,
};
use shiftline_db::DbPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::channel::{DeliveryChannelRouter, DeliveryOutcome};
use crate::error::DispatchError;
use crate::ledger::CreditLedger;
use crate::providers::ReplyParser;

/// Cost of a single acknowledgement or positions-filled SMS.
const NOTIFY_SMS_COST: i64 = 1;

/// What an inbound reply resolved to.
#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub contact_id: DbId,
    pub job_id: DbId,
    pub status: AvailabilityStatus,
    /// The job's headcount was met by this reply.
    pub job_filled: bool,
}

pub struct ReplyEngine {
    pool: DbPool,
    router: Arc<DeliveryChannelRouter>,
    ledger: Arc<CreditLedger>,
    parser: Arc<dyn ReplyParser>,
}

impl ReplyEngine {
    pub fn new(
        pool: DbPool,
        router: Arc<DeliveryChannelRouter>,
        ledger: Arc<CreditLedger>,
        parser: Arc<dyn ReplyParser>,
    ) -> Self {
        Self {
            pool,
            router,
            ledger,
            parser,
        }
    }

    /// Process one inbound SMS. Returns `Ok(None)` when the sender or an
    /// open invitation cannot be resolved.
    pub async fn handle_inbound_reply(
        &self,
        from_phone: &str,
        body: &str,
    ) -> Result<Option<ReplyOutcome>, DispatchError> {
        let Some(contact) = ContactRepo::find_by_phone(&self.pool, from_phone).await? else {
            warn!(phone = from_phone, "Inbound reply from unknown number");
            return Ok(None);
        };

        let Some(availability) =
            AvailabilityRepo::latest_open_for_contact(&self.pool, contact.id).await?
        else {
            warn!(contact_id = contact.id, "Inbound reply with no open invitation");
            return Ok(None);
        };
        let job_id = availability.job_id;

        let parsed = self.parser.parse(body);
        MessageLogRepo::append(
            &self.pool,
            Uuid::new_v4(),
            contact.account_id,
            None,
            Some(contact.id),
            event_types::RESPONSE_RECEIVED,
            json!({
                "job_id": job_id,
                "body": body,
                "parsed_status": parsed.status.as_str(),
            }),
        )
        .await?;

        AvailabilityRepo::set_status(
            &self.pool,
            job_id,
            contact.id,
            parsed.status,
            parsed.shift_preference.as_deref(),
        )
        .await?;

        match parsed.status {
            AvailabilityStatus::Confirmed => {
                ContactRepo::set_status(&self.pool, contact.id, ContactStatus::OnJob).await?;
            }
            AvailabilityStatus::Declined => {
                ContactRepo::set_status(&self.pool, contact.id, ContactStatus::Free).await?;
            }
            _ => {}
        }

        info!(
            contact_id = contact.id,
            job_id,
            status = parsed.status.as_str(),
            "Reply recorded"
        );

        if parsed.status != AvailabilityStatus::NoReply {
            self.send_acknowledgement(&contact, parsed.status).await?;
        }

        let mut job_filled = false;
        if parsed.status == AvailabilityStatus::Confirmed {
            job_filled = self.fulfillment_sweep(contact.account_id, job_id).await?;
        }

        Ok(Some(ReplyOutcome {
            contact_id: contact.id,
            job_id,
            status: parsed.status,
            job_filled,
        }))
    }

    /// Send the confirmation/decline acknowledgement, skipping it (with a
    /// log) when the account is out of credits. The reply state change above
    /// stands either way.
    async fn send_acknowledgement(
        &self,
        contact: &Contact,
        status: AvailabilityStatus,
    ) -> Result<(), DispatchError> {
        let body = match status {
            AvailabilityStatus::Confirmed => {
                "You're confirmed. We'll text you the details shortly."
            }
            AvailabilityStatus::Declined => "No problem, thanks for letting us know.",
            _ => "Thanks, we've noted your reply.",
        };

        let debits = match self
            .ledger
            .consume_credits_atomic(
                contact.account_id,
                NOTIFY_SMS_COST,
                "Reply acknowledgement",
                None,
            )
            .await
        {
            Ok(debits) => debits,
            Err(DispatchError::Core(CoreError::InsufficientCredits { .. })) => {
                warn!(
                    contact_id = contact.id,
                    account_id = contact.account_id,
                    "Skipping acknowledgement: out of credits"
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        // An SMS that never left the gateway must not stay charged.
        if self.router.send_sms(contact, None, body).await? == DeliveryOutcome::Failed {
            self.refund_debits(contact.account_id, &debits, "acknowledgement SMS failed")
                .await?;
            return Ok(());
        }
        MessageLogRepo::append(
            &self.pool,
            Uuid::new_v4(),
            contact.account_id,
            None,
            Some(contact.id),
            event_types::ACK_SENT,
            json!({ "status": status.as_str() }),
        )
        .await?;
        Ok(())
    }

    /// When a confirmation meets the job's headcount: mark the job filled
    /// and tell everyone still pending that the positions are gone.
    async fn fulfillment_sweep(
        &self,
        account_id: DbId,
        job_id: DbId,
    ) -> Result<bool, DispatchError> {
        let Some(job) = JobRepo::get_open(&self.pool, job_id).await? else {
            return Ok(false);
        };
        let Some(required) = job.required_headcount else {
            return Ok(false);
        };

        let confirmed = AvailabilityRepo::confirmed_count(&self.pool, job_id).await?;
        if confirmed < required as i64 {
            return Ok(false);
        }

        JobRepo::set_status(&self.pool, job_id, JobStatus::Filled).await?;
        info!(job_id, confirmed, "Job filled; notifying pending contacts");

        let pending = AvailabilityRepo::pending_for_job(&self.pool, job_id).await?;
        for availability in pending {
            AvailabilityRepo::set_status(
                &self.pool,
                job_id,
                availability.contact_id,
                AvailabilityStatus::Declined,
                None,
            )
            .await?;

            let Some(contact) = ContactRepo::get(&self.pool, availability.contact_id).await? else {
                continue;
            };

            let debits = match self
                .ledger
                .consume_credits_atomic(
                    account_id,
                    NOTIFY_SMS_COST,
                    "Positions filled notification",
                    None,
                )
                .await
            {
                Ok(debits) => debits,
                Err(DispatchError::Core(CoreError::InsufficientCredits { .. })) => {
                    warn!(
                        job_id,
                        contact_id = contact.id,
                        "Skipping positions-filled notice: out of credits"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            let outcome = self
                .router
                .send_sms(
                    &contact,
                    None,
                    "All positions for this shift have been filled. Thanks for replying!",
                )
                .await?;
            if outcome == DeliveryOutcome::Failed {
                self.refund_debits(account_id, &debits, "positions-filled SMS failed")
                    .await?;
                continue;
            }
            MessageLogRepo::append(
                &self.pool,
                Uuid::new_v4(),
                account_id,
                None,
                Some(contact.id),
                event_types::POSITIONS_FILLED_SENT,
                json!({ "job_id": job_id }),
            )
            .await?;
        }

        Ok(true)
    }

    /// Return the charge for a notification SMS the provider refused.
    async fn refund_debits(
        &self,
        account_id: DbId,
        debits: &[CreditTransaction],
        reason: &str,
    ) -> Result<(), DispatchError> {
        let ids: Vec<DbId> = debits.iter().map(|t| t.id).collect();
        self.ledger
            .refund_credits_atomic(account_id, &ids, reason)
            .await?;
        Ok(())
    }
}
