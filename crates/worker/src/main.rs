use std::sync::Arc;

use shiftline_dispatch::{
    CampaignDispatcher, CreditLedger, DeliveryChannelRouter, DispatchConfig,
};
use shiftline_worker::providers::{LogPushClient, LogSmsClient, NoopDistanceProvider};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shiftline_worker=debug,shiftline_dispatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = shiftline_db::connect(&database_url).await?;
    shiftline_db::run_migrations(&pool).await?;
    tracing::info!("Worker starting");

    let config = DispatchConfig::from_env();
    let ledger = Arc::new(CreditLedger::new(pool.clone(), &config));
    let router = Arc::new(DeliveryChannelRouter::new(
        pool.clone(),
        Arc::new(LogSmsClient),
        Arc::new(LogPushClient),
        config.push_fallback_grace,
    ));
    let dispatcher = Arc::new(CampaignDispatcher::new(
        pool.clone(),
        Arc::clone(&router),
        Arc::clone(&ledger),
        Arc::new(NoopDistanceProvider),
        config,
    ));
    let cancel = CancellationToken::new();
    let batch_loop = tokio::spawn(shiftline_worker::batches::run(
        pool.clone(),
        Arc::clone(&dispatcher),
        cancel.clone(),
    ));
    let fallback_loop = tokio::spawn(shiftline_worker::fallback::run(
        pool.clone(),
        Arc::clone(&router),
        Arc::clone(&ledger),
        cancel.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    let _ = batch_loop.await;
    let _ = fallback_loop.await;

    Ok(())
}
