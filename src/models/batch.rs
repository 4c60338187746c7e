//! Batch model
//!
//! A batch is one physical milk collection event, identified by a
//! human-assigned `batch_id` that is unique across all users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spoilage status of a batch or reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Still fit for consumption
    Good,
    /// Spoilage detected
    Spoiled,
}

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Good
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Good => write!(f, "good"),
            BatchStatus::Spoiled => write!(f, "spoiled"),
        }
    }
}

impl FromStr for BatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "good" => Ok(BatchStatus::Good),
            "spoiled" => Ok(BatchStatus::Spoiled),
            _ => Err(anyhow::anyhow!("Invalid batch status: {}", s)),
        }
    }
}

/// Batch entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique row identifier
    pub id: i64,
    /// Human-assigned batch identifier (globally unique)
    pub batch_id: String,
    /// Owning user
    pub user_id: i64,
    /// Name of the person who collected the batch
    pub collector_name: String,
    /// When the batch was collected (as submitted by the collector)
    pub collection_datetime: String,
    /// Current status; independent from individual reading statuses
    pub status: BatchStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Batch annotated with derived reading statistics for list/get views.
///
/// `reading_count` and `latest_shelf_life` are computed at query time,
/// never stored.
#[derive(Debug, Clone, Serialize)]
pub struct BatchWithStats {
    #[serde(flatten)]
    pub batch: Batch,
    pub reading_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_shelf_life: Option<f64>,
}

/// Input for creating a new batch
#[derive(Debug, Clone)]
pub struct CreateBatchInput {
    pub batch_id: String,
    pub collector_name: String,
    pub collection_datetime: String,
}
