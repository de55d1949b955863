//! Push-fallback reconciliation.
//!
//! A push send schedules an SMS fallback for its grace window. This loop
//! claims the deliveries whose window has elapsed without a confirmation and
//! sends the SMS, skipping contacts whose invitation has already been
//! answered in the meantime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shiftline_db::models::{AvailabilityStatus, PushDelivery};
use shiftline_db::repositories::{AvailabilityRepo, CampaignRepo, ContactRepo, PushDeliveryRepo};
use shiftline_db::DbPool;
use shiftline_dispatch::{CreditLedger, DeliveryChannelRouter, DeliveryOutcome, DispatchError};
use shiftline_core::types::DbId;
use shiftline_core::CoreError;
use tokio_util::sync::CancellationToken;

/// How often the reconciler polls for elapsed grace windows.
const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Max deliveries claimed per poll.
const CLAIM_LIMIT: i64 = 100;

/// Run the push-fallback loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    router: Arc<DeliveryChannelRouter>,
    ledger: Arc<CreditLedger>,
    cancel: CancellationToken,
) {
    tracing::info!(
        poll_secs = POLL_INTERVAL.as_secs(),
        "Push fallback reconciler started"
    );

    let mut interval = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Push fallback reconciler stopping");
                break;
            }
            _ = interval.tick() => {
                reconcile_once(&pool, &router, &ledger).await;
            }
        }
    }
}

/// Claim every elapsed fallback and send its SMS. Returns the number of
/// deliveries processed.
pub async fn reconcile_once(
    pool: &DbPool,
    router: &DeliveryChannelRouter,
    ledger: &CreditLedger,
) -> usize {
    let due = match PushDeliveryRepo::claim_due_fallbacks(pool, Utc::now(), CLAIM_LIMIT).await {
        Ok(due) => due,
        Err(e) => {
            tracing::error!(error = %e, "Fallback claim failed");
            return 0;
        }
    };
    let claimed = due.len();
    for delivery in due {
        if let Err(e) = send_fallback(pool, router, ledger, &delivery).await {
            tracing::error!(
                push_delivery_id = delivery.id,
                error = %e,
                "Fallback send failed"
            );
        }
    }
    claimed
}

/// Send the fallback SMS for one claimed push delivery.
async fn send_fallback(
    pool: &DbPool,
    router: &DeliveryChannelRouter,
    ledger: &CreditLedger,
    delivery: &PushDelivery,
) -> Result<(), DispatchError> {
    let Some(contact) = ContactRepo::get(pool, delivery.contact_id).await? else {
        tracing::warn!(push_delivery_id = delivery.id, "Fallback contact gone");
        return Ok(());
    };

    let campaign = match delivery.campaign_id {
        Some(id) => CampaignRepo::get(pool, id).await?,
        None => None,
    };

    // If the contact already answered the invitation, the push did its job
    // and the SMS is pure waste.
    if let Some(job_id) = campaign.as_ref().and_then(|c| c.job_id) {
        if let Some(availability) = AvailabilityRepo::get(pool, job_id, contact.id).await? {
            let answered = AvailabilityStatus::parse(&availability.status)
                .map(|s| !AvailabilityStatus::PENDING.contains(&s))
                .unwrap_or(false);
            if answered {
                tracing::debug!(
                    push_delivery_id = delivery.id,
                    contact_id = contact.id,
                    "Skipping fallback: invitation already answered"
                );
                return Ok(());
            }
        }
    }

    let Some(body) = campaign.as_ref().map(|c| c.body.clone()) else {
        tracing::warn!(push_delivery_id = delivery.id, "Fallback has no campaign body");
        return Ok(());
    };

    let debits = match ledger
        .consume_credits_atomic(delivery.account_id, 1, "Push fallback SMS", None)
        .await
    {
        Ok(debits) => debits,
        Err(DispatchError::Core(CoreError::InsufficientCredits { .. })) => {
            tracing::warn!(
                push_delivery_id = delivery.id,
                account_id = delivery.account_id,
                "Skipping fallback: out of credits"
            );
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let outcome = router.send_sms(&contact, delivery.campaign_id, &body).await?;
    if outcome == DeliveryOutcome::Failed {
        // The charge only stands for an SMS that actually went out.
        let ids: Vec<DbId> = debits.iter().map(|t| t.id).collect();
        ledger
            .refund_credits_atomic(delivery.account_id, &ids, "fallback SMS failed")
            .await?;
        return Ok(());
    }
    tracing::info!(
        push_delivery_id = delivery.id,
        contact_id = contact.id,
        "Fallback SMS sent"
    );
    Ok(())
}
