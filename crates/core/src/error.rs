//! Unified error types for namescan.
//!
//! Every failure that can reach a caller is a variant here, and every variant
//! has a stable [`ErrorKind`] code. The HTTP layer serializes the code next to
//! the message so clients classify failures structurally instead of matching
//! on message text.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite;

/// Unified error types for namescan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., blank name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No requested site survived allow-list filtering.
    #[error("NO_SITES: {0}")]
    NoSites(String),

    /// Upstream rejected the credentials.
    #[error("UPSTREAM_AUTH: {0}")]
    UpstreamAuth(String),

    /// Upstream or endpoint rate limited the request.
    #[error("RATE_LIMITED: {0}")]
    RateLimited(String),

    /// Upstream answered with a failure, or the fan-out batch failed.
    #[error("UPSTREAM_FAILURE: {0}")]
    Upstream(String),

    /// Transport-level failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Request timed out.
    #[error("TIMEOUT: {0}")]
    Timeout(String),

    /// Response body could not be decoded.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// Request was superseded or aborted by the caller.
    #[error("CANCELLED")]
    Cancelled,

    /// Missing or invalid configuration.
    #[error("CONFIG_ERROR: {0}")]
    Config(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

/// Stable, serializable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    NoSites,
    UpstreamAuth,
    RateLimited,
    UpstreamFailure,
    NetworkError,
    Timeout,
    ParseError,
    Cancelled,
    ConfigError,
    CacheError,
}

impl ErrorKind {
    /// HTTP status code the endpoint answers with for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidInput | ErrorKind::NoSites => 400,
            ErrorKind::RateLimited => 429,
            _ => 500,
        }
    }

    /// Wire code, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::NoSites => "NO_SITES",
            ErrorKind::UpstreamAuth => "UPSTREAM_AUTH",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::UpstreamFailure => "UPSTREAM_FAILURE",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::ConfigError => "CONFIG_ERROR",
            ErrorKind::CacheError => "CACHE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NoSites(_) => ErrorKind::NoSites,
            Error::UpstreamAuth(_) => ErrorKind::UpstreamAuth,
            Error::RateLimited(_) => ErrorKind::RateLimited,
            Error::Upstream(_) => ErrorKind::UpstreamFailure,
            Error::Network(_) => ErrorKind::NetworkError,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Parse(_) => ErrorKind::ParseError,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config(_) => ErrorKind::ConfigError,
            Error::Database(_) | Error::MigrationFailed(_) => ErrorKind::CacheError,
        }
    }

    /// HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    /// Message without the code prefix, suitable for an `{"error": ...}` body.
    pub fn message(&self) -> String {
        match self {
            Error::InvalidInput(msg)
            | Error::NoSites(msg)
            | Error::UpstreamAuth(msg)
            | Error::RateLimited(msg)
            | Error::Upstream(msg)
            | Error::Network(msg)
            | Error::Timeout(msg)
            | Error::Parse(msg)
            | Error::Config(msg)
            | Error::MigrationFailed(msg) => msg.clone(),
            Error::Cancelled => "request cancelled".to_string(),
            Error::Database(e) => e.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Wire shape of an error response: `{"error": "<message>", "code": "<KIND>"}`.
///
/// `code` is optional on input so bodies that only carry a message still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorKind>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self { error: err.message(), code: Some(err.kind()) }
    }
}
