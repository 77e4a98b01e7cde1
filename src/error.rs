use std::collections::TryReserveError;

use thiserror::Error;

/// Main error type for pendex operations
#[derive(Error, Debug)]
pub enum PendexError {
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    #[error("sink error: {0}")]
    Sink(String),
}

/// Result type alias for pendex operations
pub type Result<T> = std::result::Result<T, PendexError>;

impl PendexError {
    /// Wrap a consumer-side failure raised from a drain sink callback.
    pub fn sink(msg: impl Into<String>) -> Self {
        PendexError::Sink(msg.into())
    }
}
