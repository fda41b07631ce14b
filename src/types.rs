//! Error types for Alcove

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, AlcoveError>;

/// Errors surfaced by the relay
///
/// Handler-level failures are logged and drop the offending event for that
/// connection only; the process never exits for a per-connection error.
#[derive(Debug, Error)]
pub enum AlcoveError {
    /// Durable store (Redis) failure
    #[error("Store error: {0}")]
    Store(String),

    /// Listener and socket failures
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire message encoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Everything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<redis::RedisError> for AlcoveError {
    fn from(e: redis::RedisError) -> Self {
        AlcoveError::Store(e.to_string())
    }
}
