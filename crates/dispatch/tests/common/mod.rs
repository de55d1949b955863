//! Shared fixtures for dispatch engine tests: recording/mock providers and
//! entity builders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shiftline_core::types::DbId;
use shiftline_db::models::{Account, Contact, CreateContact, CreateJob, Job};
use shiftline_db::repositories::{AccountRepo, ContactRepo, JobRepo};
use shiftline_dispatch::providers::{
    DistanceProvider, ProviderError, PushClient, PushSendResult, SmsClient,
};
use shiftline_dispatch::{
    CampaignDispatcher, CreditLedger, DeliveryChannelRouter, DispatchConfig,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Mock providers
// ---------------------------------------------------------------------------

/// Records every SMS instead of sending; can be flipped to fail.
#[derive(Default)]
pub struct RecordingSms {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingSms {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsClient for RecordingSms {
    async fn send(&self, to: &str, body: &str) -> Result<String, ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError("gateway unavailable".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), body.to_string()));
        Ok(format!("sms-{}", sent.len()))
    }
}

/// Accepts every push and records the batches.
#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<Vec<String>>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl PushClient for RecordingPush {
    async fn send(
        &self,
        tokens: &[String],
        _title: &str,
        _body: &str,
        _data: serde_json::Value,
    ) -> Result<PushSendResult, ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError("push service down".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(tokens.to_vec());
        Ok(PushSendResult {
            success: tokens.len(),
            failed: 0,
            notification_ids: vec![format!("push-{}", sent.len())],
        })
    }
}

/// Serves distances from a fixed map.
#[derive(Default)]
pub struct FixedDistances {
    pub meters: HashMap<DbId, f64>,
}

#[async_trait]
impl DistanceProvider for FixedDistances {
    async fn batch_distance(
        &self,
        _origin: &str,
        destinations: &[(DbId, String)],
    ) -> Result<HashMap<DbId, f64>, ProviderError> {
        Ok(destinations
            .iter()
            .filter_map(|(id, _)| self.meters.get(id).map(|d| (*id, *d)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Engine wiring
// ---------------------------------------------------------------------------

pub struct TestEngine {
    pub ledger: Arc<CreditLedger>,
    pub router: Arc<DeliveryChannelRouter>,
    pub dispatcher: Arc<CampaignDispatcher>,
    pub sms: Arc<RecordingSms>,
    pub push: Arc<RecordingPush>,
}

/// Build a fully wired engine over mocks with a small batch size so tests
/// exercise multi-batch campaigns cheaply.
pub fn build_engine(pool: PgPool, batch_size: usize, distances: FixedDistances) -> TestEngine {
    let config = DispatchConfig {
        batch_size,
        batch_delay: Duration::from_secs(60),
        push_fallback_grace: Duration::from_secs(60),
        account_lock_wait: Duration::from_secs(5),
        ..DispatchConfig::default()
    };
    let sms = Arc::new(RecordingSms::default());
    let push = Arc::new(RecordingPush::default());
    let ledger = Arc::new(CreditLedger::new(pool.clone(), &config));
    let router = Arc::new(DeliveryChannelRouter::new(
        pool.clone(),
        Arc::clone(&sms) as Arc<dyn SmsClient>,
        Arc::clone(&push) as Arc<dyn PushClient>,
        config.push_fallback_grace,
    ));
    let dispatcher = Arc::new(CampaignDispatcher::new(
        pool,
        Arc::clone(&router),
        Arc::clone(&ledger),
        Arc::new(distances),
        config,
    ));
    TestEngine {
        ledger,
        router,
        dispatcher,
        sms,
        push,
    }
}

// ---------------------------------------------------------------------------
// Entity builders
// ---------------------------------------------------------------------------

pub async fn make_account(pool: &PgPool) -> Account {
    AccountRepo::create(pool, "Test Staffing").await.unwrap()
}

/// An SMS-only contact with a unique GB mobile number.
pub async fn make_contact(pool: &PgPool, account_id: DbId, name: &str, suffix: u32) -> Contact {
    ContactRepo::create(
        pool,
        account_id,
        &CreateContact {
            name: name.to_string(),
            phone_country: "GB".to_string(),
            phone_raw: format!("07700 9{suffix:05}"),
            address: format!("{suffix} Dock Road, Portsmouth"),
            tags: vec![],
            skills: vec!["forklift".to_string()],
            blackout_notes: None,
            opted_out: false,
            can_log_in: false,
            device_tokens: vec![],
        },
    )
    .await
    .unwrap()
}

pub async fn make_job(pool: &PgPool, account_id: DbId, headcount: i32) -> Job {
    JobRepo::create(
        pool,
        account_id,
        &CreateJob {
            title: "Warehouse shift".to_string(),
            location: "Dock 4, Portsmouth".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 9, 1, 16, 0, 0).unwrap(),
            required_headcount: Some(headcount),
            notes: None,
        },
    )
    .await
    .unwrap()
}
