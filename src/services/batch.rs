//! Batch service
//!
//! Registration and lifecycle of milk batches. The batch identifier is
//! claimed globally at insert time; losing the race surfaces as a conflict,
//! never as a second row.

use crate::db::repositories::{is_unique_violation, BatchRepository};
use crate::models::{BatchStatus, BatchWithStats, CreateBatchInput};
use std::sync::Arc;

/// Error types for batch operations
#[derive(Debug, thiserror::Error)]
pub enum BatchServiceError {
    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Batch identifier already claimed
    #[error("Batch ID already exists: {0}")]
    DuplicateBatchId(String),

    /// Batch not found for this user
    #[error("Batch not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Batch service
pub struct BatchService {
    batch_repo: Arc<dyn BatchRepository>,
}

impl BatchService {
    pub fn new(batch_repo: Arc<dyn BatchRepository>) -> Self {
        Self { batch_repo }
    }

    /// Register a new batch under the given user.
    pub async fn create(
        &self,
        user_id: i64,
        input: CreateBatchInput,
    ) -> Result<BatchWithStats, BatchServiceError> {
        let batch_id = input.batch_id.trim().to_string();
        if batch_id.is_empty() {
            return Err(BatchServiceError::ValidationError(
                "Batch ID cannot be empty".to_string(),
            ));
        }
        if input.collector_name.trim().is_empty() {
            return Err(BatchServiceError::ValidationError(
                "Collector name cannot be empty".to_string(),
            ));
        }
        if input.collection_datetime.trim().is_empty() {
            return Err(BatchServiceError::ValidationError(
                "Collection datetime cannot be empty".to_string(),
            ));
        }

        let input = CreateBatchInput {
            batch_id: batch_id.clone(),
            collector_name: input.collector_name.trim().to_string(),
            collection_datetime: input.collection_datetime.trim().to_string(),
        };

        match self.batch_repo.create(user_id, &input).await {
            Ok(batch) => {
                tracing::info!(user_id, batch_id = %batch.batch_id, "Batch registered");
                Ok(BatchWithStats {
                    batch,
                    reading_count: 0,
                    latest_shelf_life: None,
                })
            }
            Err(e) if is_unique_violation(&e) => {
                Err(BatchServiceError::DuplicateBatchId(batch_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List the user's batches, newest first, with reading statistics.
    pub async fn list(&self, user_id: i64) -> Result<Vec<BatchWithStats>, BatchServiceError> {
        Ok(self.batch_repo.list(user_id).await?)
    }

    /// Fetch one of the user's batches.
    pub async fn get(
        &self,
        user_id: i64,
        batch_id: &str,
    ) -> Result<BatchWithStats, BatchServiceError> {
        self.batch_repo
            .get(user_id, batch_id)
            .await?
            .ok_or_else(|| BatchServiceError::NotFound(batch_id.to_string()))
    }

    /// Set a batch's status. A missing batch is an error, not a no-op.
    pub async fn update_status(
        &self,
        user_id: i64,
        batch_id: &str,
        status: BatchStatus,
    ) -> Result<BatchWithStats, BatchServiceError> {
        let updated = self
            .batch_repo
            .update_status(user_id, batch_id, status)
            .await?;
        if updated == 0 {
            return Err(BatchServiceError::NotFound(batch_id.to_string()));
        }

        self.get(user_id, batch_id).await
    }

    /// Delete a batch and its readings. Archived history survives.
    pub async fn delete(&self, user_id: i64, batch_id: &str) -> Result<(), BatchServiceError> {
        let removed = self.batch_repo.delete(user_id, batch_id).await?;
        if removed == 0 {
            return Err(BatchServiceError::NotFound(batch_id.to_string()));
        }

        tracing::info!(user_id, batch_id, "Batch deleted");
        Ok(())
    }
}
