//! Sensor reading and classification verdict models

use crate::models::BatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One gas-concentration sample tied to a batch identifier.
///
/// Append-only: readings are never updated in place. The `batch_id` is a
/// plain string and is not required to reference a batch row (sensor firmware
/// may report under the `DEFAULT` id before a batch is registered).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    /// Unique row identifier
    pub id: i64,
    /// Batch identifier the sample belongs to
    pub batch_id: String,
    /// Ethanol concentration (ppm, non-negative)
    pub ethanol: f64,
    /// Ammonia concentration (ppm, non-negative)
    pub ammonia: f64,
    /// Hydrogen sulfide concentration (ppm, non-negative)
    pub h2s: f64,
    /// Status derived at classification time
    pub status: BatchStatus,
    /// Predicted shelf life in days
    pub predicted_shelf_life: f64,
    /// Creation timestamp; "latest" queries order by this, newest first
    pub created_at: DateTime<Utc>,
}

/// The (status, shelf-life, confidence) triple produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: BatchStatus,
    /// Predicted shelf life in days (0 when spoiled)
    pub shelf_life: f64,
    /// Predictor confidence; the fallback heuristic reports a lower constant
    pub confidence: f64,
}

/// Projection of a reading for latest/history queries.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingSnapshot {
    pub ethanol: f64,
    pub ammonia: f64,
    pub h2s: f64,
    pub status: BatchStatus,
    pub shelf_life: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<SensorReading> for ReadingSnapshot {
    fn from(reading: SensorReading) -> Self {
        Self {
            ethanol: reading.ethanol,
            ammonia: reading.ammonia,
            h2s: reading.h2s,
            status: reading.status,
            shelf_life: reading.predicted_shelf_life,
            timestamp: reading.created_at,
        }
    }
}
