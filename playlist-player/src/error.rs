//! Error types for playlist-player
//!
//! Every public coordinator operation returns either a value or exactly one
//! of these errors.

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for the playlist player
#[derive(Error, Debug)]
pub enum Error {
    /// No matching track, or no current track for next/prev
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected request argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the current playback state
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Playback worker did not take a control signal within the bounded wait
    #[error("Playback timeout expired: {0}")]
    Timeout(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status reported for this error by the control API
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Database(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convenience Result type using the playlist-player Error
pub type Result<T> = std::result::Result<T, Error>;
