//! Reading service
//!
//! Accepts gas samples from sensor firmware, classifies them, and appends
//! them to the reading log. Classification prefers the model service and
//! degrades to the threshold heuristic, so ingestion keeps working during
//! model outages.

use crate::db::repositories::ReadingRepository;
use crate::models::{ReadingSnapshot, SensorReading};
use crate::services::predictor::{fallback_verdict, Predictor};
use std::sync::Arc;

/// Default number of rows returned by history queries
const DEFAULT_HISTORY_LIMIT: i64 = 100;
/// Upper bound on history queries
const MAX_HISTORY_LIMIT: i64 = 1000;

/// Error types for reading operations
#[derive(Debug, thiserror::Error)]
pub enum ReadingServiceError {
    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A stored reading together with how it was classified
#[derive(Debug, Clone)]
pub struct RecordedReading {
    pub reading: SensorReading,
    /// Confidence reported by whichever classifier produced the verdict
    pub confidence: f64,
    /// True when the threshold heuristic was used instead of the model
    pub fallback: bool,
}

/// Reading service
pub struct ReadingService {
    reading_repo: Arc<dyn ReadingRepository>,
    predictor: Arc<dyn Predictor>,
}

impl ReadingService {
    pub fn new(reading_repo: Arc<dyn ReadingRepository>, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            reading_repo,
            predictor,
        }
    }

    /// Classify and store one gas sample.
    ///
    /// Negative gas values are clamped to zero before classification; sensor
    /// noise below baseline should not flip a verdict. Non-finite values are
    /// rejected.
    pub async fn record(
        &self,
        batch_id: &str,
        ethanol: f64,
        ammonia: f64,
        h2s: f64,
    ) -> Result<RecordedReading, ReadingServiceError> {
        let batch_id = batch_id.trim();
        if batch_id.is_empty() {
            return Err(ReadingServiceError::ValidationError(
                "Batch ID cannot be empty".to_string(),
            ));
        }
        for (name, value) in [("ethanol", ethanol), ("ammonia", ammonia), ("h2s", h2s)] {
            if !value.is_finite() {
                return Err(ReadingServiceError::ValidationError(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }

        let ethanol = ethanol.max(0.0);
        let ammonia = ammonia.max(0.0);
        let h2s = h2s.max(0.0);

        let (verdict, fallback) = match self.predictor.predict(ethanol, ammonia, h2s).await {
            Ok(verdict) => (verdict, false),
            Err(e) => {
                tracing::warn!(error = %e, "Model service unavailable, using threshold fallback");
                (fallback_verdict(ethanol, ammonia, h2s), true)
            }
        };

        let reading = self
            .reading_repo
            .insert(batch_id, ethanol, ammonia, h2s, &verdict)
            .await?;

        tracing::debug!(
            batch_id,
            status = %reading.status,
            fallback,
            "Reading recorded"
        );

        Ok(RecordedReading {
            reading,
            confidence: verdict.confidence,
            fallback,
        })
    }

    /// Most recent reading, optionally scoped to a batch.
    pub async fn latest(
        &self,
        batch_id: Option<&str>,
    ) -> Result<Option<ReadingSnapshot>, ReadingServiceError> {
        let reading = self.reading_repo.latest(batch_id).await?;
        Ok(reading.map(ReadingSnapshot::from))
    }

    /// Recent readings for one batch, newest first.
    pub async fn history(
        &self,
        batch_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ReadingSnapshot>, ReadingServiceError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        let readings = self.reading_repo.history(batch_id, limit).await?;
        Ok(readings.into_iter().map(ReadingSnapshot::from).collect())
    }
}
