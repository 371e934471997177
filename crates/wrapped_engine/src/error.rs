use thiserror::Error;

/// Transport-level failures. Callers treat these as transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("could not decode store response: {0}")]
    Decode(String),
    #[error("change feed missed {0} updates")]
    FeedGap(u64),
    #[error("store does not support change subscriptions")]
    SubscriptionUnsupported,
    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Failures of the create path, surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("wallet already has an active job: {0}")]
    Conflict(String),
    #[error("could not remove previous jobs: {0}")]
    Cleanup(StoreError),
    #[error("could not create job: {0}")]
    Store(StoreError),
}

impl CreateError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CreateError::Conflict(_))
    }
}
