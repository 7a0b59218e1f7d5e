//! Common error types for tannoy

use thiserror::Error;

/// Common result type for tannoy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tannoy services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested record or audio resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external playback command is not installed
    #[error("Playback command not found: {0}")]
    PlayerMissing(String),

    /// The playback command ran but reported failure
    #[error("Playback failed: {0}")]
    Playback(String),

    /// A single receiver endpoint could not be reached or rejected a message
    #[error("Delivery to {endpoint} failed: {reason}")]
    Delivery { endpoint: String, reason: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
