//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - Tenant-scoped import review routes
//! - Health check route
//! - Error-to-HTTP mapping, including extractor rejections

pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
};
use tally_core::import_review::ImportReviewService;
use tally_shared::{AppError, config::ServerConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Import review engine.
    pub import_review: Arc<ImportReviewService>,
}

impl AppState {
    /// Creates the state around an import review service.
    #[must_use]
    pub fn new(import_review: ImportReviewService) -> Self {
        Self {
            import_review: Arc::new(import_review),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    AppError::NotFound(format!("No route for {}", uri.path())).into()
}
