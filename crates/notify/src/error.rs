use aisle_core::error::CoreError;

/// Errors surfaced by the engine, the scheduler and the stores.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

impl From<validator::ValidationErrors> for NotifyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        NotifyError::Core(CoreError::from(errors))
    }
}

/// Why a single send was not accepted by a dispatch channel.
///
/// These never abort a batch; the engine records them per guest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Simulated {channel} API error")]
    SimulatedApiError { channel: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded { recipient: String },

    #[error("{0}")]
    Unavailable(String),

    #[error("Guest has no phone number")]
    MissingRecipient,
}
