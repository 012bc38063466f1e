//! Error types for Reel

use std::io;
use thiserror::Error;

/// Result type for Reel operations
pub type Result<T> = std::result::Result<T, ReelError>;

/// Errors that can occur in Reel
#[derive(Debug, Error)]
pub enum ReelError {
    /// I/O error while reading or writing a cassette
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Cassette file is missing required fields or has the wrong shape
    #[error("Malformed cassette: {0}")]
    MalformedCassette(String),

    /// Replay requested past the end of the stored interactions
    #[error("no more saved interactions for current {method} request for {uri}")]
    CassetteExhausted {
        /// Method of the unsatisfied request
        method: String,
        /// URI of the unsatisfied request
        uri: String,
    },

    /// Next stored interaction does not match the request being made
    #[error(
        "current {method} request for {uri} differs from saved {saved_method} request for {saved_uri}"
    )]
    CassetteMismatch {
        /// Requested method
        method: String,
        /// Requested URI
        uri: String,
        /// Method of the next stored interaction
        saved_method: String,
        /// URI of the next stored interaction
        saved_uri: String,
    },

    /// Captured body read before delivery completed
    #[error("body not yet delivered")]
    BodyNotYetDelivered,

    /// Body selected for text form is not valid UTF-8
    #[error("Body cannot be stored as text: {0}")]
    UnencodableBody(String),

    /// Request cannot be expressed on the wire
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failure reported by the underlying HTTP client
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Body too large
    #[error("Data too large: {size} bytes exceeds limit of {limit} bytes")]
    DataTooLarge {
        /// Actual size
        size: usize,
        /// Size limit
        limit: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ReelError {
    /// Whether this error came from replay matching rather than I/O or the network
    #[must_use]
    pub fn is_replay_failure(&self) -> bool {
        matches!(
            self,
            Self::CassetteExhausted { .. } | Self::CassetteMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::Io(err.into())
        } else {
            Self::MalformedCassette(err.to_string())
        }
    }
}
