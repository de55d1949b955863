use shiftline_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Domain errors: invalid amounts, insufficient credits, bad refund
    /// targets, validation failures, lock timeouts.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    /// A provider call failed in a context where it cannot be recorded as a
    /// per-contact delivery failure (batch sends swallow these instead).
    #[error("Provider failure on {channel}: {message}")]
    Provider { channel: &'static str, message: String },
}
