//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod health;
pub mod import_review;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(import_review::routes())
}
