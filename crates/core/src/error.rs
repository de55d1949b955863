use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A credit amount that must be strictly positive was zero or negative.
    #[error("Invalid credit amount: {amount} (must be > 0)")]
    InvalidAmount { amount: i64 },

    /// The account does not hold enough unexpired credits for the request.
    #[error("Insufficient credits: requested {requested}, available {available}")]
    InsufficientCredits { requested: i64, available: i64 },

    /// A refund referenced a transaction that is missing, belongs to another
    /// account, is not a debit, or was already refunded.
    #[error("Invalid refund target: {reason}")]
    InvalidRefundTarget { reason: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Bounded wait on a per-account lock expired before the lock was won.
    #[error("Timed out after {waited_ms} ms waiting for account lock")]
    LockTimeout { waited_ms: u64 },
}
