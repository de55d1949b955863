//! Credit ledger models: grants and their immutable transactions.

use serde::Serialize;
use shiftline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Legal values of `credit_grants.source_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantSourceType {
    Trial,
    Subscription,
    Bundle,
    Admin,
}

impl GrantSourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantSourceType::Trial => "trial",
            GrantSourceType::Subscription => "subscription",
            GrantSourceType::Bundle => "bundle",
            GrantSourceType::Admin => "admin",
        }
    }
}

/// A row from `credit_grants`. Never deleted; `granted = consumed +
/// remaining` is CHECK-enforced.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditGrant {
    pub id: DbId,
    pub account_id: DbId,
    pub source_type: String,
    pub source_ref: Option<String>,
    pub credits_granted: i64,
    pub credits_consumed: i64,
    pub credits_remaining: i64,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A row from `credit_transactions`. Negative delta = consumption; positive
/// = grant or refund. `refunded_at` blocks refunding the same debit twice.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditTransaction {
    pub id: DbId,
    pub grant_id: DbId,
    pub account_id: DbId,
    pub delta: i64,
    pub reason: String,
    pub message_id: Option<DbId>,
    pub refunded_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
