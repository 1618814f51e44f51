//! Error types for mission-core

use thiserror::Error;

/// Result type alias using mission-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the collaborators around the chat core.
///
/// Compression, routing and sanitizing are total and never produce these.
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the completion oracle
    #[error(transparent)]
    Ai(#[from] mission_ai::Error),

    /// The history store failed to read or append
    #[error("History error: {0}")]
    History(String),

    /// A generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if this error indicates a context overflow
    pub fn is_context_overflow(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_context_overflow(),
            _ => false,
        }
    }

    /// Check if retrying the same turn later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_retryable(),
            _ => false,
        }
    }
}
