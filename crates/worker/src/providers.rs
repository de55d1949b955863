//! Development provider implementations.
//!
//! The engine only sees the provider traits; these log-only implementations
//! let the worker run end to end without vendor credentials. Real gateways
//! slot in behind the same traits.

use std::collections::HashMap;

use async_trait::async_trait;
use shiftline_core::types::DbId;
use shiftline_dispatch::providers::{
    DistanceProvider, ProviderError, PushClient, PushSendResult, SmsClient,
};
use uuid::Uuid;

/// Logs outbound SMS instead of sending them.
#[derive(Debug, Default)]
pub struct LogSmsClient;

#[async_trait]
impl SmsClient for LogSmsClient {
    async fn send(&self, to: &str, body: &str) -> Result<String, ProviderError> {
        let message_id = Uuid::new_v4().to_string();
        tracing::info!(to, chars = body.len(), message_id, "SMS (log only)");
        Ok(message_id)
    }
}

/// Logs push notifications and reports every token as accepted.
#[derive(Debug, Default)]
pub struct LogPushClient;

#[async_trait]
impl PushClient for LogPushClient {
    async fn send(
        &self,
        tokens: &[String],
        title: &str,
        _body: &str,
        _data: serde_json::Value,
    ) -> Result<PushSendResult, ProviderError> {
        let notification_id = Uuid::new_v4().to_string();
        tracing::info!(devices = tokens.len(), title, notification_id, "Push (log only)");
        Ok(PushSendResult {
            success: tokens.len(),
            failed: 0,
            notification_ids: vec![notification_id],
        })
    }
}

/// Resolves no distances, which pushes ranking onto the token-overlap
/// location fallback.
#[derive(Debug, Default)]
pub struct NoopDistanceProvider;

#[async_trait]
impl DistanceProvider for NoopDistanceProvider {
    async fn batch_distance(
        &self,
        _origin: &str,
        _destinations: &[(DbId, String)],
    ) -> Result<HashMap<DbId, f64>, ProviderError> {
        Ok(HashMap::new())
    }
}
