//! Import review routes.
//!
//! All routes are scoped to the tenant in the path. The statement parser runs
//! upstream; `POST /imports` receives its output (records plus parse errors).

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tally_core::import_review::{DuplicateStatus, ParsedStatement, ReviewFilter};
use tally_shared::{
    AppError,
    types::{PageRequest, TenantId, TransactionKey},
};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
};

/// Creates the import review routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/imports", post(import_statement))
        .route(
            "/tenants/{tenant_id}/imports/review",
            get(get_review_page).delete(delete_review),
        )
        .route("/tenants/{tenant_id}/imports/review/summary", get(get_summary))
        .route("/tenants/{tenant_id}/imports/review/selection", post(set_selection))
        .route("/tenants/{tenant_id}/imports/review/select-all", post(select_all))
        .route("/tenants/{tenant_id}/imports/review/deselect-all", post(deselect_all))
        .route("/tenants/{tenant_id}/imports/review/complete", post(complete_review))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for a review page.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewPageQuery {
    /// Page number (1-based); values below 1 are treated as 1.
    pub page: Option<i64>,
    /// Page size; defaults to 50, capped at 1000.
    pub page_size: Option<i64>,
    /// Optional duplicate status filter.
    pub status: Option<String>,
}

impl ReviewPageQuery {
    fn filter(&self) -> Result<ReviewFilter, AppError> {
        let duplicate_status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<DuplicateStatus>)
            .transpose()
            .map_err(AppError::Validation)?;

        Ok(ReviewFilter { duplicate_status })
    }
}

/// Request body for changing the selection of specific rows.
#[derive(Debug, Deserialize)]
pub struct SetSelectionRequest {
    /// Keys of the staged rows.
    pub keys: Vec<TransactionKey>,
    /// New value of the selection flag.
    pub selected: bool,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/tenants/{tenant_id}/imports` - Classify and stage a parsed statement.
async fn import_statement(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
    ApiJson(statement): ApiJson<ParsedStatement>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .import_review
        .import_batch(TenantId::from_uuid(tenant_id), statement)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET `/tenants/{tenant_id}/imports/review` - One page of staged rows.
async fn get_review_page(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ReviewPageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.filter()?;
    let page = PageRequest::from_query(query.page, query.page_size);

    let response = state
        .import_review
        .get_review_page(TenantId::from_uuid(tenant_id), page, filter)
        .await?;

    Ok(Json(response))
}

/// GET `/tenants/{tenant_id}/imports/review/summary` - Review counts.
async fn get_summary(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .import_review
        .get_summary(TenantId::from_uuid(tenant_id))
        .await?;

    Ok(Json(summary))
}

/// POST `/tenants/{tenant_id}/imports/review/selection` - Select or deselect rows.
async fn set_selection(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<SetSelectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .import_review
        .set_selection(TenantId::from_uuid(tenant_id), &payload.keys, payload.selected)
        .await?;

    Ok(Json(json!({ "updated": updated })))
}

/// POST `/tenants/{tenant_id}/imports/review/select-all`
async fn select_all(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .import_review
        .select_all(TenantId::from_uuid(tenant_id))
        .await?;

    Ok(Json(json!({ "updated": updated })))
}

/// POST `/tenants/{tenant_id}/imports/review/deselect-all`
async fn deselect_all(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .import_review
        .deselect_all(TenantId::from_uuid(tenant_id))
        .await?;

    Ok(Json(json!({ "updated": updated })))
}

/// POST `/tenants/{tenant_id}/imports/review/complete` - Accept selected rows.
///
/// Takes no body: what gets accepted is read from the stored selection.
async fn complete_review(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .import_review
        .complete_review(TenantId::from_uuid(tenant_id))
        .await?;

    Ok(Json(result))
}

/// DELETE `/tenants/{tenant_id}/imports/review` - Discard the whole review.
async fn delete_review(
    State(state): State<AppState>,
    ApiPath(tenant_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .import_review
        .delete_all_review(TenantId::from_uuid(tenant_id))
        .await?;

    Ok(Json(json!({ "deleted": deleted })))
}
