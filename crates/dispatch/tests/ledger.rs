//! Integration tests for the credit ledger: consumption ordering, atomicity,
//! refunds, and concurrent spend safety.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::{build_engine, make_account, FixedDistances};
use shiftline_core::CoreError;
use shiftline_db::models::GrantSourceType;
use shiftline_db::repositories::{CreditGrantRepo, CreditTransactionRepo};
use shiftline_dispatch::DispatchError;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: consumption debits soonest-expiring grants first
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_consumption_prefers_expiring_grants(pool: PgPool) {
    let engine = build_engine(pool.clone(), 5, FixedDistances::default());
    let account = make_account(&pool).await;

    let never = engine
        .ledger
        .grant_credits(account.id, GrantSourceType::Admin, 10, None, None)
        .await
        .unwrap();
    let soon = engine
        .ledger
        .grant_credits(
            account.id,
            GrantSourceType::Trial,
            3,
            None,
            Some(Utc::now() + Duration::days(7)),
        )
        .await
        .unwrap();

    // 5 = all 3 expiring + 2 from the non-expiring grant.
    let debits = engine
        .ledger
        .consume_credits_atomic(account.id, 5, "test send", None)
        .await
        .unwrap();
    assert_eq!(debits.len(), 2);
    assert_eq!(debits[0].grant_id, soon.id);
    assert_eq!(debits[0].delta, -3);
    assert_eq!(debits[1].grant_id, never.id);
    assert_eq!(debits[1].delta, -2);

    let soon_after = CreditGrantRepo::get(&pool, soon.id).await.unwrap().unwrap();
    assert_eq!(soon_after.credits_remaining, 0);
    let never_after = CreditGrantRepo::get(&pool, never.id).await.unwrap().unwrap();
    assert_eq!(never_after.credits_remaining, 8);
}

// ---------------------------------------------------------------------------
// Test: insufficient balance mutates nothing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_insufficient_credits_leaves_balance_untouched(pool: PgPool) {
    let engine = build_engine(pool.clone(), 5, FixedDistances::default());
    let account = make_account(&pool).await;
    engine
        .ledger
        .grant_credits(account.id, GrantSourceType::Bundle, 4, None, None)
        .await
        .unwrap();

    let err = engine
        .ledger
        .consume_credits_atomic(account.id, 10, "too big", None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        DispatchError::Core(CoreError::InsufficientCredits {
            requested: 10,
            available: 4
        })
    );

    assert_eq!(engine.ledger.available_credits(account.id).await.unwrap(), 4);
    // Only the grant's own positive transaction exists.
    let txns = CreditTransactionRepo::list_for_account(&pool, account.id)
        .await
        .unwrap();
    assert_eq!(txns.len(), 1);
    assert!(txns[0].delta > 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_non_positive_amounts_are_rejected(pool: PgPool) {
    let engine = build_engine(pool.clone(), 5, FixedDistances::default());
    let account = make_account(&pool).await;

    let err = engine
        .ledger
        .consume_credits_atomic(account.id, 0, "zero", None)
        .await
        .unwrap_err();
    assert_matches!(err, DispatchError::Core(CoreError::InvalidAmount { amount: 0 }));

    let err = engine
        .ledger
        .grant_credits(account.id, GrantSourceType::Admin, -5, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, DispatchError::Core(CoreError::InvalidAmount { amount: -5 }));
}

// ---------------------------------------------------------------------------
// Test: refunds restore exactly and exactly once
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_refund_restores_exact_amount(pool: PgPool) {
    let engine = build_engine(pool.clone(), 5, FixedDistances::default());
    let account = make_account(&pool).await;
    engine
        .ledger
        .grant_credits(account.id, GrantSourceType::Bundle, 20, None, None)
        .await
        .unwrap();

    let debits = engine
        .ledger
        .consume_credits_atomic(account.id, 7, "send", None)
        .await
        .unwrap();
    assert_eq!(engine.ledger.available_credits(account.id).await.unwrap(), 13);

    let refunds = engine
        .ledger
        .refund_credits_atomic(account.id, &[debits[0].id], "provider rejected")
        .await
        .unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].delta, 7);
    assert!(refunds[0].reason.starts_with("Refund: "));
    assert_eq!(engine.ledger.available_credits(account.id).await.unwrap(), 20);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_double_refund_is_refused(pool: PgPool) {
    let engine = build_engine(pool.clone(), 5, FixedDistances::default());
    let account = make_account(&pool).await;
    engine
        .ledger
        .grant_credits(account.id, GrantSourceType::Bundle, 10, None, None)
        .await
        .unwrap();
    let debits = engine
        .ledger
        .consume_credits_atomic(account.id, 4, "send", None)
        .await
        .unwrap();

    engine
        .ledger
        .refund_credits_atomic(account.id, &[debits[0].id], "first")
        .await
        .unwrap();
    let err = engine
        .ledger
        .refund_credits_atomic(account.id, &[debits[0].id], "second")
        .await
        .unwrap_err();
    assert_matches!(err, DispatchError::Core(CoreError::InvalidRefundTarget { .. }));

    // Balance reflects exactly one refund.
    assert_eq!(engine.ledger.available_credits(account.id).await.unwrap(), 10);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_refund_rejects_bad_targets(pool: PgPool) {
    let engine = build_engine(pool.clone(), 5, FixedDistances::default());
    let account = make_account(&pool).await;
    let other = make_account(&pool).await;
    let grant = engine
        .ledger
        .grant_credits(account.id, GrantSourceType::Bundle, 10, None, None)
        .await
        .unwrap();

    // Nonexistent transaction.
    let err = engine
        .ledger
        .refund_credits_atomic(account.id, &[999_999], "missing")
        .await
        .unwrap_err();
    assert_matches!(err, DispatchError::Core(CoreError::InvalidRefundTarget { .. }));

    // A positive (grant) transaction is not refundable.
    let txns = CreditTransactionRepo::list_for_account(&pool, account.id)
        .await
        .unwrap();
    let grant_txn = txns.iter().find(|t| t.grant_id == grant.id).unwrap();
    let err = engine
        .ledger
        .refund_credits_atomic(account.id, &[grant_txn.id], "not a debit")
        .await
        .unwrap_err();
    assert_matches!(err, DispatchError::Core(CoreError::InvalidRefundTarget { .. }));

    // A debit belonging to another account is refused.
    let debits = engine
        .ledger
        .consume_credits_atomic(account.id, 2, "send", None)
        .await
        .unwrap();
    let err = engine
        .ledger
        .refund_credits_atomic(other.id, &[debits[0].id], "wrong account")
        .await
        .unwrap_err();
    assert_matches!(err, DispatchError::Core(CoreError::InvalidRefundTarget { .. }));

    // One bad target poisons the whole batch; the valid debit stays spent.
    let err = engine
        .ledger
        .refund_credits_atomic(account.id, &[debits[0].id, 999_999], "partial")
        .await
        .unwrap_err();
    assert_matches!(err, DispatchError::Core(CoreError::InvalidRefundTarget { .. }));
    assert_eq!(engine.ledger.available_credits(account.id).await.unwrap(), 8);

    // And it is still refundable on its own afterwards.
    let refunds = engine
        .ledger
        .refund_credits_atomic(account.id, &[debits[0].id], "provider rejected")
        .await
        .unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(engine.ledger.available_credits(account.id).await.unwrap(), 10);
}

// ---------------------------------------------------------------------------
// Test: concurrent consumption never oversells
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_concurrent_spends_never_oversell(pool: PgPool) {
    let engine = build_engine(pool.clone(), 5, FixedDistances::default());
    let account = make_account(&pool).await;
    engine
        .ledger
        .grant_credits(account.id, GrantSourceType::Bundle, 10, None, None)
        .await
        .unwrap();

    // 20 concurrent attempts to spend 1 credit against a balance of 10.
    let attempts = (0..20).map(|_| {
        let ledger = Arc::clone(&engine.ledger);
        let account_id = account.id;
        async move {
            ledger
                .consume_credits_atomic(account_id, 1, "race", None)
                .await
        }
    });
    let results = futures::future::join_all(attempts).await;

    let mut successes = 0;
    let mut insufficient = 0;
    for result in results {
        match result {
            Ok(_) => successes += 1,
            Err(DispatchError::Core(CoreError::InsufficientCredits { .. })) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 10);
    assert_eq!(insufficient, 10);
    assert_eq!(engine.ledger.available_credits(account.id).await.unwrap(), 0);
}
