//! Per-account serialization for ledger mutations.
//!
//! Ledger writes for one account must not interleave: two concurrent
//! consumptions could both read the same grant balances and oversell.
//! Each account gets its own async mutex; acquisition is bounded so a
//! stuck caller surfaces as a `LockTimeout` instead of a hang.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shiftline_core::{types::DbId, CoreError};
use tokio::sync::OwnedMutexGuard;

/// Keyed lock table: one async mutex per account id.
///
/// `tokio::sync::Mutex` hands the lock to waiters in FIFO order, so
/// queued ledger operations for an account run in arrival order.
#[derive(Default)]
pub struct AccountLocks {
    inner: Mutex<HashMap<DbId, Arc<tokio::sync::Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `account_id`, waiting at most `wait`.
    pub async fn acquire(
        &self,
        account_id: DbId,
        wait: Duration,
    ) -> Result<OwnedMutexGuard<()>, CoreError> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(map.entry(account_id).or_default())
        };
        tokio::time::timeout(wait, lock.lock_owned())
            .await
            .map_err(|_| CoreError::LockTimeout {
                waited_ms: wait.as_millis() as u64,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_is_exclusive_per_account() {
        let locks = Arc::new(AccountLocks::new());
        let guard = locks.acquire(1, Duration::from_millis(100)).await.unwrap();

        // Same account blocks until released.
        let err = locks.acquire(1, Duration::from_millis(50)).await;
        assert!(matches!(err, Err(CoreError::LockTimeout { .. })));

        // A different account is unaffected.
        let other = locks.acquire(2, Duration::from_millis(50)).await;
        assert!(other.is_ok());

        drop(guard);
        let reacquired = locks.acquire(1, Duration::from_millis(50)).await;
        assert!(reacquired.is_ok());
    }
}
