//! Error types for contrib-wall.

use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Forge API error
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// Persisted order could not be read or written
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction or response decoding error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Layout emitter failure
    #[error("Render error: {0}")]
    Render(String),

    /// The forge returned a pagination cursor that does not move forward
    #[error("Pagination error: {0}")]
    Pagination(String),
}

impl Error {
    /// Check if this error may succeed when the same request is repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Forge(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Signalled wait before the next attempt, if the forge gave one.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Forge(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Typed errors for forge API failures.
///
/// Each variant corresponds to one failure category of the forge REST API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForgeError {
    /// Credential missing or rejected (401, or 403 without rate limiting).
    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// Repository does not exist or is hidden from this credential (404).
    #[error("repository {repository} not found: {message}")]
    RepositoryNotFound { repository: String, message: String },

    /// Network error or timeout on a single request.
    #[error("transient fetch failure: {message}")]
    Transient { message: String },

    /// Rate limit exhausted (429, or 403 with no remaining quota).
    #[error("rate limited: {message} (retry after {retry_after}s)")]
    RateLimited { message: String, retry_after: u64 },

    /// Repository has no commits yet (409 on the commits listing).
    #[error("repository {repository} is empty: {message}")]
    EmptyRepository { repository: String, message: String },

    /// Server-side failure (5xx).
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success response.
    #[error("unexpected response ({status}): {message}")]
    Unexpected { status: u16, message: String },
}

impl ForgeError {
    /// HTTP status that produced this error, when there was a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::Server { status, .. }
            | Self::Unexpected { status, .. } => Some(*status),
            Self::RepositoryNotFound { .. } => Some(404),
            Self::EmptyRepository { .. } => Some(409),
            Self::RateLimited { .. } | Self::Transient { .. } => None,
        }
    }

    /// Get the retry-after value for rate limited errors.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transient { .. } | Self::RateLimited { .. } | Self::Server { .. }
        )
    }
}

/// Persisted order store failures.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("persisted order for {key} unavailable: {message}")]
    Unavailable { key: String, message: String },
}
