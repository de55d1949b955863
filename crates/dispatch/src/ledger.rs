//! The credit ledger: grant, consume, refund, and balance queries.
//!
//! Every mutation is all-or-nothing. A consumption either debits exactly the
//! requested amount across the account's grants (soonest expiry first) or
//! changes nothing. Two layers guard concurrent spends on the same account: a
//! bounded in-process keyed lock serializes callers in this process, and the
//! `FOR UPDATE` balance read inside the transaction protects against anyone
//! else.

use std::sync::Arc;

use chrono::Utc;
use shiftline_core::credits::{plan_consumption, GrantBalance};
use shiftline_core::types::{DbId, Timestamp};
use shiftline_core::CoreError;
use shiftline_db::models::{CreditGrant, CreditTransaction, GrantSourceType};
use shiftline_db::repositories::{CreditGrantRepo, CreditTransactionRepo};
use shiftline_db::DbPool;
use tracing::info;

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::locks::AccountLocks;

/// Reason recorded on the positive transaction row created by a grant.
const GRANT_REASON: &str = "Credit grant";

#[derive(Clone)]
pub struct CreditLedger {
    pool: DbPool,
    locks: Arc<AccountLocks>,
    lock_wait: std::time::Duration,
}

impl CreditLedger {
    pub fn new(pool: DbPool, config: &DispatchConfig) -> Self {
        Self {
            pool,
            locks: Arc::new(AccountLocks::new()),
            lock_wait: config.account_lock_wait,
        }
    }

    /// Add a new grant of `amount` credits to the account.
    pub async fn grant_credits(
        &self,
        account_id: DbId,
        source_type: GrantSourceType,
        amount: i64,
        source_ref: Option<&str>,
        expires_at: Option<Timestamp>,
    ) -> Result<CreditGrant, DispatchError> {
        if amount <= 0 {
            return Err(CoreError::InvalidAmount { amount }.into());
        }

        let mut tx = self.pool.begin().await?;
        let grant = CreditGrantRepo::create(
            &mut *tx,
            account_id,
            source_type,
            amount,
            source_ref,
            expires_at,
        )
        .await?;
        CreditTransactionRepo::insert(&mut *tx, grant.id, account_id, amount, GRANT_REASON, None)
            .await?;
        tx.commit().await?;

        info!(
            account_id,
            grant_id = grant.id,
            amount,
            source_type = source_type.as_str(),
            "Granted credits"
        );
        Ok(grant)
    }

    /// Atomically consume `amount` credits from the account's live grants.
    ///
    /// Grants are debited in expiry order. Returns the debit transaction
    /// rows; on any failure the account balance is untouched.
    pub async fn consume_credits_atomic(
        &self,
        account_id: DbId,
        amount: i64,
        reason: &str,
        message_id: Option<DbId>,
    ) -> Result<Vec<CreditTransaction>, DispatchError> {
        if amount <= 0 {
            return Err(CoreError::InvalidAmount { amount }.into());
        }

        let _guard = self.locks.acquire(account_id, self.lock_wait).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let grants = CreditGrantRepo::lock_live_for_account(&mut *tx, account_id, now).await?;
        let balances: Vec<GrantBalance> = grants
            .iter()
            .map(|g| GrantBalance {
                grant_id: g.id,
                remaining: g.credits_remaining,
            })
            .collect();

        let debits = plan_consumption(&balances, amount)?;

        let mut transactions = Vec::with_capacity(debits.len());
        for debit in &debits {
            CreditGrantRepo::apply_debit(&mut *tx, debit.grant_id, debit.amount).await?;
            let txn = CreditTransactionRepo::insert(
                &mut *tx,
                debit.grant_id,
                account_id,
                -debit.amount,
                reason,
                message_id,
            )
            .await?;
            transactions.push(txn);
        }
        tx.commit().await?;

        info!(
            account_id,
            amount,
            grants_touched = transactions.len(),
            reason,
            "Consumed credits"
        );
        Ok(transactions)
    }

    /// Refund prior debits in full, back onto their original grants.
    ///
    /// Every target must be a consumption transaction belonging to
    /// `account_id` that has not been refunded before; any bad target
    /// refuses the whole call with [`CoreError::InvalidRefundTarget`] and
    /// nothing is refunded.
    pub async fn refund_credits_atomic(
        &self,
        account_id: DbId,
        transaction_ids: &[DbId],
        reason: &str,
    ) -> Result<Vec<CreditTransaction>, DispatchError> {
        let _guard = self.locks.acquire(account_id, self.lock_wait).await?;

        let mut tx = self.pool.begin().await?;
        let mut refunds = Vec::with_capacity(transaction_ids.len());
        let mut total = 0i64;
        for &transaction_id in transaction_ids {
            let target = CreditTransactionRepo::lock(&mut *tx, transaction_id)
                .await?
                .ok_or_else(|| CoreError::InvalidRefundTarget {
                    reason: "transaction does not exist".to_string(),
                })?;

            if target.account_id != account_id {
                return Err(CoreError::InvalidRefundTarget {
                    reason: "transaction belongs to a different account".to_string(),
                }
                .into());
            }
            if target.delta >= 0 {
                return Err(CoreError::InvalidRefundTarget {
                    reason: "only consumption transactions can be refunded".to_string(),
                }
                .into());
            }
            if !CreditTransactionRepo::mark_refunded(&mut *tx, transaction_id).await? {
                return Err(CoreError::InvalidRefundTarget {
                    reason: "transaction was already refunded".to_string(),
                }
                .into());
            }

            let amount = -target.delta;
            CreditGrantRepo::apply_refund(&mut *tx, target.grant_id, amount).await?;
            let refund = CreditTransactionRepo::insert(
                &mut *tx,
                target.grant_id,
                account_id,
                amount,
                &format!("Refund: {reason}"),
                target.message_id,
            )
            .await?;
            total += amount;
            refunds.push(refund);
        }
        tx.commit().await?;

        info!(
            account_id,
            transactions = refunds.len(),
            total,
            "Refunded credits"
        );
        Ok(refunds)
    }

    /// Sum of unexpired remaining credits for the account.
    pub async fn available_credits(&self, account_id: DbId) -> Result<i64, DispatchError> {
        Ok(CreditGrantRepo::available(&self.pool, account_id, Utc::now()).await?)
    }
}
