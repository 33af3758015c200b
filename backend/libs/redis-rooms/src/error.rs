//! Error types for room broadcast operations

use thiserror::Error;

/// Room adapter errors
#[derive(Error, Debug)]
pub enum RoomsError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Envelope serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local socket can no longer accept events
    #[error("Socket closed: {0}")]
    SocketClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}
