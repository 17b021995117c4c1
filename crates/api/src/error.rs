//! Error-to-HTTP mapping.
//!
//! Every failure is rendered as `{"error": <code>, "message": <text>}` with
//! the status the error reports for itself. Internal failures are logged and
//! answered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::import_review::ImportReviewError;
use tally_shared::AppError;
use thiserror::Error;
use tracing::error;

/// Error returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Import review engine error.
    #[error(transparent)]
    Review(#[from] ImportReviewError),

    /// Request-level error raised by the HTTP layer itself.
    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    /// Returns the HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            Self::Review(e) => e.http_status_code(),
            Self::App(e) => e.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the error code for the response body.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Review(e) => e.error_code(),
            Self::App(e) => e.error_code(),
        }
    }

    /// Returns true if the client may retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Review(e) => e.is_retryable(),
            Self::App(_) => false,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() && !self.is_retryable() {
            error!(error = %self, code = self.error_code(), "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}
