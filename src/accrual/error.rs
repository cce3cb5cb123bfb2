use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccrualError {
    /// Authority answered 429; not a failure of the order
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

impl AccrualError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccrualError::RateLimited { .. })
    }
}
