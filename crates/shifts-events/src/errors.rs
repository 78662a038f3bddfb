//! Event channel error types.

use thiserror::Error;

/// Errors raised while publishing to or talking with the event broker.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The Redis broker rejected a command or could not be reached.
    #[error("broker error: {0}")]
    Broker(#[from] redis::RedisError),
    /// An event could not be encoded.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for event channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
