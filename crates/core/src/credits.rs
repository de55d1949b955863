//! Pure planning for credit consumption.
//!
//! The ledger debits expiring grants before non-expiring ones. The ordering
//! itself is decided by the caller (a SQL `ORDER BY expires_at NULLS LAST,
//! id`); this module takes the already-ordered balances and computes the
//! per-grant debit amounts, or refuses with no plan at all. Keeping the
//! arithmetic here means the ledger never mutates anything a plan did not
//! pre-validate.

use crate::error::CoreError;
use crate::types::DbId;

/// The remaining balance of one live grant, in consumption order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantBalance {
    pub grant_id: DbId,
    pub remaining: i64,
}

/// One planned debit against one grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantDebit {
    pub grant_id: DbId,
    pub amount: i64,
}

/// Compute the per-grant debits needed to consume `amount` credits.
///
/// `balances` must already be in consumption order (soonest expiry first,
/// non-expiring last, creation order as tie-break). Fails with
/// [`CoreError::InvalidAmount`] for non-positive amounts and
/// [`CoreError::InsufficientCredits`] when the balances do not cover the
/// request; in both cases nothing is planned.
pub fn plan_consumption(
    balances: &[GrantBalance],
    amount: i64,
) -> Result<Vec<GrantDebit>, CoreError> {
    if amount <= 0 {
        return Err(CoreError::InvalidAmount { amount });
    }

    let available: i64 = balances.iter().map(|b| b.remaining.max(0)).sum();
    if available < amount {
        return Err(CoreError::InsufficientCredits {
            requested: amount,
            available,
        });
    }

    let mut debits = Vec::new();
    let mut outstanding = amount;
    for balance in balances {
        if outstanding == 0 {
            break;
        }
        if balance.remaining <= 0 {
            continue;
        }
        let take = balance.remaining.min(outstanding);
        debits.push(GrantDebit {
            grant_id: balance.grant_id,
            amount: take,
        });
        outstanding -= take;
    }

    debug_assert_eq!(outstanding, 0);
    Ok(debits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn balance(grant_id: DbId, remaining: i64) -> GrantBalance {
        GrantBalance { grant_id, remaining }
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = plan_consumption(&[balance(1, 10)], 0).unwrap_err();
        assert_matches!(err, CoreError::InvalidAmount { amount: 0 });
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = plan_consumption(&[balance(1, 10)], -3).unwrap_err();
        assert_matches!(err, CoreError::InvalidAmount { amount: -3 });
    }

    #[test]
    fn insufficient_balance_plans_nothing() {
        let err = plan_consumption(&[balance(1, 4), balance(2, 2)], 100).unwrap_err();
        assert_matches!(
            err,
            CoreError::InsufficientCredits {
                requested: 100,
                available: 6
            }
        );
    }

    #[test]
    fn single_grant_partial_debit() {
        let debits = plan_consumption(&[balance(7, 10)], 4).unwrap();
        assert_eq!(debits, vec![GrantDebit { grant_id: 7, amount: 4 }]);
    }

    #[test]
    fn exhausts_earlier_grants_before_later_ones() {
        // Grant 1 expires first (caller ordering), grant 2 later.
        let debits = plan_consumption(&[balance(1, 3), balance(2, 10)], 5).unwrap();
        assert_eq!(
            debits,
            vec![
                GrantDebit { grant_id: 1, amount: 3 },
                GrantDebit { grant_id: 2, amount: 2 },
            ]
        );
    }

    #[test]
    fn exact_fit_consumes_everything() {
        let debits = plan_consumption(&[balance(1, 2), balance(2, 3)], 5).unwrap();
        let total: i64 = debits.iter().map(|d| d.amount).sum();
        assert_eq!(total, 5);
        assert_eq!(debits.len(), 2);
    }

    #[test]
    fn empty_and_negative_balances_are_skipped() {
        let debits =
            plan_consumption(&[balance(1, 0), balance(2, -5), balance(3, 6)], 4).unwrap();
        assert_eq!(debits, vec![GrantDebit { grant_id: 3, amount: 4 }]);
    }

    #[test]
    fn planned_total_always_equals_amount() {
        let balances = [balance(1, 1), balance(2, 2), balance(3, 3), balance(4, 4)];
        for amount in 1..=10 {
            let debits = plan_consumption(&balances, amount).unwrap();
            let total: i64 = debits.iter().map(|d| d.amount).sum();
            assert_eq!(total, amount, "plan for {amount} must sum exactly");
            for d in &debits {
                assert!(d.amount > 0, "no zero/negative debits in a plan");
            }
        }
    }
}
