//! Sensor reading endpoints
//!
//! - POST /api/v1/readings - Ingest and classify a gas sample
//! - GET  /api/v1/readings/latest - Most recent reading
//! - GET  /api/v1/readings/history - Recent readings for a batch
//!
//! Firmware may omit any field; gases default to zero and the batch id to
//! `DEFAULT`, so a half-configured sensor still lands readings somewhere.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::ReadingSnapshot;
use crate::services::{ReadingServiceError, RecordedReading};

/// Batch identifier used when firmware does not report one
pub const DEFAULT_BATCH_ID: &str = "DEFAULT";

impl From<ReadingServiceError> for ApiError {
    fn from(e: ReadingServiceError) -> Self {
        match e {
            ReadingServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ReadingServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

fn default_batch_id() -> String {
    DEFAULT_BATCH_ID.to_string()
}

/// Request body for reading ingestion
#[derive(Debug, Deserialize)]
pub struct RecordReadingRequest {
    #[serde(default = "default_batch_id")]
    pub batch_id: String,
    #[serde(default)]
    pub ethanol: f64,
    #[serde(default)]
    pub ammonia: f64,
    #[serde(default)]
    pub h2s: f64,
}

/// Query parameters for the latest-reading endpoint
#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub batch_id: Option<String>,
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_batch_id")]
    pub batch_id: String,
    pub limit: Option<i64>,
}

/// Response for a classified reading
#[derive(Debug, Serialize)]
pub struct ReadingResponse {
    pub batch_id: String,
    pub ethanol: f64,
    pub ammonia: f64,
    pub h2s: f64,
    pub status: String,
    pub shelf_life: f64,
    pub confidence: f64,
    pub fallback: bool,
    pub timestamp: String,
}

impl From<RecordedReading> for ReadingResponse {
    fn from(recorded: RecordedReading) -> Self {
        let reading = recorded.reading;
        Self {
            batch_id: reading.batch_id,
            ethanol: reading.ethanol,
            ammonia: reading.ammonia,
            h2s: reading.h2s,
            status: reading.status.to_string(),
            shelf_life: reading.predicted_shelf_life,
            confidence: recorded.confidence,
            fallback: recorded.fallback,
            timestamp: reading.created_at.to_rfc3339(),
        }
    }
}

/// Build the readings router (mounted behind auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(record_reading))
        .route("/latest", get(latest_reading))
        .route("/history", get(reading_history))
}

/// POST /api/v1/readings
async fn record_reading(
    State(state): State<AppState>,
    Json(body): Json<RecordReadingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recorded = state
        .reading_service
        .record(&body.batch_id, body.ethanol, body.ammonia, body.h2s)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ReadingResponse::from(recorded))),
    ))
}

/// GET /api/v1/readings/latest
async fn latest_reading(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let latest: Option<ReadingSnapshot> =
        state.reading_service.latest(query.batch_id.as_deref()).await?;

    Ok(Json(ApiResponse::ok(latest)))
}

/// GET /api/v1/readings/history
async fn reading_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let readings = state
        .reading_service
        .history(&query.batch_id, query.limit)
        .await?;

    Ok(Json(ApiResponse::ok(readings)))
}
