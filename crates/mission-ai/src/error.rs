//! Error types for mission-ai

use thiserror::Error;

/// Result type alias using mission-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the completion oracle
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Rate limit or quota exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Context overflow / too many tokens
    #[error("Context overflow: {0}")]
    ContextOverflow(String),

    /// The model finished without producing any text
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Every model in the fallback list failed
    #[error("All models failed:\n{0}")]
    AllModelsFailed(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Classify an error reported by a completion stream.
    ///
    /// `status` is the HTTP status (or the error code in the payload) when
    /// the provider gave one.
    pub fn from_stream(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == Some(429) {
            return Error::RateLimited(message);
        }
        if status == Some(401) || message.to_lowercase().contains("api key not valid") {
            return Error::InvalidApiKey;
        }

        let error_type = match status {
            Some(code) => format!("http_{}", code),
            None => "stream_error".to_string(),
        };
        let error = Error::api(error_type, message.clone());
        if error.is_context_overflow() {
            Error::ContextOverflow(message)
        } else {
            error
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited(_) | Error::Sse(_) => true,
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                et.contains("rate_limit")
                    || et.contains("resource_exhausted")
                    || et.contains("unavailable")
                    || msg.contains("rate limit")
                    || msg.contains("overloaded")
                    || msg.contains("too many requests")
                    || msg.contains("quota")
            }
            _ => false,
        }
    }

    /// Check if this error indicates a context overflow / too many tokens
    pub fn is_context_overflow(&self) -> bool {
        match self {
            Error::ContextOverflow(_) => true,
            Error::Api { message, .. } => {
                let msg = message.to_lowercase();
                msg.contains("too many tokens")
                    || msg.contains("context length")
                    || msg.contains("context window")
                    || msg.contains("token limit")
                    || msg.contains("input token count")
                    || msg.contains("request too large")
                    || msg.contains("input too long")
            }
            _ => false,
        }
    }
}
