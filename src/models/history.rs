//! Batch history model
//!
//! An immutable snapshot of a batch's final verdict, archived at most once
//! per (user, batch_id) pair for audit and reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Archived batch snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchHistory {
    /// Unique row identifier
    pub id: i64,
    /// Batch identifier the snapshot was taken from
    pub batch_id: String,
    /// Owning user
    pub user_id: i64,
    /// Collector recorded on the batch
    pub collector_name: String,
    /// Collection timestamp recorded on the batch
    pub collection_datetime: String,
    /// Gas levels at archival time
    pub ethanol: f64,
    pub ammonia: f64,
    pub h2s: f64,
    /// Final grade string (GOOD / SPOILED)
    pub grade: String,
    /// Shelf-life value at archival time (days)
    pub shelf_life: f64,
    /// When the snapshot was saved
    pub saved_at: DateTime<Utc>,
}

/// Input for archiving a batch snapshot
#[derive(Debug, Clone)]
pub struct SaveHistoryInput {
    pub batch_id: String,
    pub collector_name: String,
    pub collection_datetime: String,
    pub ethanol: f64,
    pub ammonia: f64,
    pub h2s: f64,
    pub grade: String,
    pub shelf_life: f64,
}
