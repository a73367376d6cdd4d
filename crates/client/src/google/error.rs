//! Upstream search API error types.

use std::sync::Arc;

use namescan_core::Error;

/// Errors from the upstream search API client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    /// API key or scope id not configured.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid search query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: API key rejected")]
    AuthError,

    /// Rate limited by the upstream API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}{}", detail(.message))]
    HttpError { status: u16, message: Option<String> },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

fn detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default()
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { UpstreamError::Timeout } else { UpstreamError::Network(Arc::new(err)) }
    }
}

impl From<UpstreamError> for Error {
    fn from(err: UpstreamError) -> Self {
        let message = err.to_string();
        match err {
            UpstreamError::MissingCredentials(msg) => Error::Config(msg),
            UpstreamError::InvalidQuery(msg) => Error::InvalidInput(msg),
            UpstreamError::AuthError => Error::UpstreamAuth(message),
            UpstreamError::RateLimited => Error::RateLimited(message),
            UpstreamError::Timeout => Error::Timeout(message),
            UpstreamError::Network(_) => Error::Network(message),
            UpstreamError::Parse(msg) => Error::Parse(msg),
            UpstreamError::HttpError { .. } => Error::Upstream(message),
        }
    }
}
