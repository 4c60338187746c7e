//! History service
//!
//! Archives a final snapshot of a batch. Each (user, batch) pair gets at
//! most one snapshot; re-archiving is a conflict rather than an overwrite.

use crate::db::repositories::{is_unique_violation, HistoryRepository};
use crate::models::{BatchHistory, SaveHistoryInput};
use std::str::FromStr;
use std::sync::Arc;

/// Error types for history operations
#[derive(Debug, thiserror::Error)]
pub enum HistoryServiceError {
    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Batch already archived for this user
    #[error("Batch already archived: {0}")]
    AlreadyArchived(String),

    /// History entry not found for this user
    #[error("History entry not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// History service
pub struct HistoryService {
    history_repo: Arc<dyn HistoryRepository>,
}

impl HistoryService {
    pub fn new(history_repo: Arc<dyn HistoryRepository>) -> Self {
        Self { history_repo }
    }

    /// Archive a batch snapshot for the user.
    ///
    /// The grade is normalized to uppercase and must be a known status.
    pub async fn save(
        &self,
        user_id: i64,
        input: SaveHistoryInput,
    ) -> Result<BatchHistory, HistoryServiceError> {
        let batch_id = input.batch_id.trim().to_string();
        if batch_id.is_empty() {
            return Err(HistoryServiceError::ValidationError(
                "Batch ID cannot be empty".to_string(),
            ));
        }

        let collector_name = input.collector_name.trim().to_string();
        if collector_name.is_empty() {
            return Err(HistoryServiceError::ValidationError(
                "Collector name cannot be empty".to_string(),
            ));
        }

        let collection_datetime = input.collection_datetime.trim().to_string();
        if collection_datetime.is_empty() {
            return Err(HistoryServiceError::ValidationError(
                "Collection datetime cannot be empty".to_string(),
            ));
        }

        let grade = input.grade.trim().to_uppercase();
        if crate::models::BatchStatus::from_str(&grade).is_err() {
            return Err(HistoryServiceError::ValidationError(format!(
                "Unknown grade: {}",
                input.grade
            )));
        }

        if input.shelf_life < 0.0 || !input.shelf_life.is_finite() {
            return Err(HistoryServiceError::ValidationError(
                "Shelf life must be a non-negative number".to_string(),
            ));
        }

        let input = SaveHistoryInput {
            batch_id: batch_id.clone(),
            collector_name,
            collection_datetime,
            grade,
            ..input
        };

        match self.history_repo.insert(user_id, &input).await {
            Ok(entry) => {
                tracing::info!(user_id, batch_id = %entry.batch_id, "Batch archived");
                Ok(entry)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(HistoryServiceError::AlreadyArchived(batch_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List the user's archived snapshots, newest first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<BatchHistory>, HistoryServiceError> {
        Ok(self.history_repo.list(user_id).await?)
    }

    /// Fetch one snapshot by row id.
    pub async fn get(&self, user_id: i64, id: i64) -> Result<BatchHistory, HistoryServiceError> {
        self.history_repo
            .get(user_id, id)
            .await?
            .ok_or(HistoryServiceError::NotFound)
    }

    /// Delete a snapshot. A missing entry is an error, not a no-op.
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), HistoryServiceError> {
        let removed = self.history_repo.delete(user_id, id).await?;
        if removed == 0 {
            return Err(HistoryServiceError::NotFound);
        }

        tracing::info!(user_id, history_id = id, "History entry deleted");
        Ok(())
    }
}
