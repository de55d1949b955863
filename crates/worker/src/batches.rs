//! Deferred-batch runner.
//!
//! Campaign batches are durable rows, not in-memory timers: each one is
//! claimed with `FOR UPDATE SKIP LOCKED`, so multiple worker replicas can
//! poll concurrently without double-running a batch. A batch that errors is
//! retried a bounded number of times by the repository before being parked
//! as failed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shiftline_db::repositories::CampaignBatchRepo;
use shiftline_db::DbPool;
use shiftline_dispatch::CampaignDispatcher;
use tokio_util::sync::CancellationToken;

/// How often the runner polls for due batches.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Run the deferred-batch loop until `cancel` is triggered.
pub async fn run(pool: DbPool, dispatcher: Arc<CampaignDispatcher>, cancel: CancellationToken) {
    tracing::info!(
        poll_secs = POLL_INTERVAL.as_secs(),
        "Batch runner started"
    );

    let mut interval = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Batch runner stopping");
                break;
            }
            _ = interval.tick() => {
                drain_due(&pool, &dispatcher).await;
            }
        }
    }
}

/// Claim and run every batch that is currently due.
pub async fn drain_due(pool: &DbPool, dispatcher: &CampaignDispatcher) {
    loop {
        let batch = match CampaignBatchRepo::claim_due(pool, Utc::now()).await {
            Ok(Some(batch)) => batch,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Batch claim failed");
                return;
            }
        };

        tracing::debug!(
            batch_id = batch.id,
            campaign_id = batch.campaign_id,
            attempt = batch.attempts,
            "Running deferred batch"
        );

        match dispatcher.run_batch(batch.campaign_id).await {
            Ok(summary) => {
                if let Err(e) = CampaignBatchRepo::mark_done(pool, batch.id).await {
                    tracing::error!(batch_id = batch.id, error = %e, "Failed to mark batch done");
                }
                tracing::info!(
                    batch_id = batch.id,
                    campaign_id = batch.campaign_id,
                    queued = summary.queued,
                    "Deferred batch ran"
                );
            }
            Err(e) => {
                tracing::error!(
                    batch_id = batch.id,
                    campaign_id = batch.campaign_id,
                    error = %e,
                    "Deferred batch failed"
                );
                if let Err(e) = CampaignBatchRepo::mark_failed(pool, batch.id, &e.to_string()).await
                {
                    tracing::error!(batch_id = batch.id, error = %e, "Failed to mark batch failed");
                }
            }
        }
    }
}
