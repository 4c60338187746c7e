//! Batch endpoints
//!
//! - GET    /api/v1/batches - List the user's batches
//! - POST   /api/v1/batches - Register a batch
//! - GET    /api/v1/batches/{batch_id} - Fetch one batch
//! - PUT    /api/v1/batches/{batch_id}/status - Set batch status
//! - DELETE /api/v1/batches/{batch_id} - Delete a batch
//!
//! All routes require a session; every query is scoped to the caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ApiResponse;
use crate::models::{BatchStatus, CreateBatchInput};
use crate::services::BatchServiceError;

impl From<BatchServiceError> for ApiError {
    fn from(e: BatchServiceError) -> Self {
        match e {
            BatchServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            BatchServiceError::DuplicateBatchId(id) => {
                ApiError::conflict(format!("Batch ID already exists: {}", id))
            }
            BatchServiceError::NotFound(id) => ApiError::not_found(format!("Batch not found: {}", id)),
            BatchServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

/// Request body for batch registration
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub batch_id: String,
    pub collector_name: String,
    pub collection_datetime: String,
}

/// Request body for status updates
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Build the batch router (mounted behind auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_batches).post(create_batch))
        .route("/{batch_id}", get(get_batch).delete(delete_batch))
        .route("/{batch_id}/status", put(update_status))
}

/// GET /api/v1/batches
async fn list_batches(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let batches = state.batch_service.list(user.id).await?;
    Ok(Json(ApiResponse::ok(batches)))
}

/// POST /api/v1/batches
async fn create_batch(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(body): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = state
        .batch_service
        .create(
            user.id,
            CreateBatchInput {
                batch_id: body.batch_id,
                collector_name: body.collector_name,
                collection_datetime: body.collection_datetime,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(batch))))
}

/// GET /api/v1/batches/{batch_id}
async fn get_batch(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(batch_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = state.batch_service.get(user.id, &batch_id).await?;
    Ok(Json(ApiResponse::ok(batch)))
}

/// PUT /api/v1/batches/{batch_id}/status
async fn update_status(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(batch_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = BatchStatus::from_str(&body.status)
        .map_err(|_| ApiError::validation_error(format!("Unknown status: {}", body.status)))?;

    let batch = state
        .batch_service
        .update_status(user.id, &batch_id, status)
        .await?;

    Ok(Json(ApiResponse::ok(batch)))
}

/// DELETE /api/v1/batches/{batch_id}
async fn delete_batch(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(batch_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.batch_service.delete(user.id, &batch_id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}
