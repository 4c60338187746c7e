//! Batch history endpoints
//!
//! - GET    /api/v1/history - List archived snapshots
//! - POST   /api/v1/history - Archive a batch snapshot
//! - GET    /api/v1/history/{id} - Fetch one snapshot
//! - DELETE /api/v1/history/{id} - Delete a snapshot

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ApiResponse;
use crate::models::SaveHistoryInput;
use crate::services::HistoryServiceError;

impl From<HistoryServiceError> for ApiError {
    fn from(e: HistoryServiceError) -> Self {
        match e {
            HistoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            HistoryServiceError::AlreadyArchived(id) => {
                ApiError::conflict(format!("Batch already archived: {}", id))
            }
            HistoryServiceError::NotFound => ApiError::not_found("History entry not found"),
            HistoryServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

/// Request body for archiving a batch
#[derive(Debug, Deserialize)]
pub struct SaveHistoryRequest {
    pub batch_id: String,
    pub collector_name: String,
    pub collection_datetime: String,
    #[serde(default)]
    pub ethanol: f64,
    #[serde(default)]
    pub ammonia: f64,
    #[serde(default)]
    pub h2s: f64,
    pub grade: String,
    #[serde(default)]
    pub shelf_life: f64,
}

/// Build the history router (mounted behind auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_history).post(save_history))
        .route("/{id}", get(get_history).delete(delete_history))
}

/// GET /api/v1/history
async fn list_history(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.history_service.list(user.id).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

/// POST /api/v1/history
async fn save_history(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(body): Json<SaveHistoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .history_service
        .save(
            user.id,
            SaveHistoryInput {
                batch_id: body.batch_id,
                collector_name: body.collector_name,
                collection_datetime: body.collection_datetime,
                ethanol: body.ethanol,
                ammonia: body.ammonia,
                h2s: body.h2s,
                grade: body.grade,
                shelf_life: body.shelf_life,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}

/// GET /api/v1/history/{id}
async fn get_history(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state.history_service.get(user.id, id).await?;
    Ok(Json(ApiResponse::ok(entry)))
}

/// DELETE /api/v1/history/{id}
async fn delete_history(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.history_service.delete(user.id, id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}
