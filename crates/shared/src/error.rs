//! Application-wide error types.

use thiserror::Error;

/// Errors raised by the HTTP layer itself, before a request reaches the engine.
#[derive(Debug, Error)]
pub enum AppError {
    /// No route or resource matches the request.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed path, query string or body.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }
}
