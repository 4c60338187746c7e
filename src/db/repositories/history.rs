//! Batch history repository

use crate::models::{BatchHistory, SaveHistoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Batch history repository trait
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Archive a batch snapshot for a user
    async fn insert(&self, user_id: i64, input: &SaveHistoryInput) -> Result<BatchHistory>;

    /// List a user's archived snapshots, newest first
    async fn list(&self, user_id: i64) -> Result<Vec<BatchHistory>>;

    /// Get one of a user's snapshots by row id
    async fn get(&self, user_id: i64, id: i64) -> Result<Option<BatchHistory>>;

    /// Delete a snapshot, returning the number of rows removed
    async fn delete(&self, user_id: i64, id: i64) -> Result<u64>;
}

/// SQLx-based batch history repository implementation
pub struct SqlxHistoryRepository {
    pool: SqlitePool,
}

impl SqlxHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn HistoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl HistoryRepository for SqlxHistoryRepository {
    async fn insert(&self, user_id: i64, input: &SaveHistoryInput) -> Result<BatchHistory> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO batch_history (batch_id, user_id, collector_name, collection_datetime,
                                       ethanol, ammonia, h2s, grade, shelf_life, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.batch_id)
        .bind(user_id)
        .bind(&input.collector_name)
        .bind(&input.collection_datetime)
        .bind(input.ethanol)
        .bind(input.ammonia)
        .bind(input.h2s)
        .bind(&input.grade)
        .bind(input.shelf_life)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to insert batch history")?;

        Ok(BatchHistory {
            id: result.last_insert_rowid(),
            batch_id: input.batch_id.clone(),
            user_id,
            collector_name: input.collector_name.clone(),
            collection_datetime: input.collection_datetime.clone(),
            ethanol: input.ethanol,
            ammonia: input.ammonia,
            h2s: input.h2s,
            grade: input.grade.clone(),
            shelf_life: input.shelf_life,
            saved_at: now,
        })
    }

    async fn list(&self, user_id: i64) -> Result<Vec<BatchHistory>> {
        let rows = sqlx::query(
            "SELECT id, batch_id, user_id, collector_name, collection_datetime, \
             ethanol, ammonia, h2s, grade, shelf_life, saved_at \
             FROM batch_history WHERE user_id = ? \
             ORDER BY saved_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list batch history")?;

        Ok(rows.iter().map(row_to_history).collect())
    }

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<BatchHistory>> {
        let row = sqlx::query(
            "SELECT id, batch_id, user_id, collector_name, collection_datetime, \
             ethanol, ammonia, h2s, grade, shelf_life, saved_at \
             FROM batch_history WHERE user_id = ? AND id = ?",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get batch history entry")?;

        Ok(row.as_ref().map(row_to_history))
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM batch_history WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete batch history entry")?;

        Ok(result.rows_affected())
    }
}

fn row_to_history(row: &sqlx::sqlite::SqliteRow) -> BatchHistory {
    BatchHistory {
        id: row.get("id"),
        batch_id: row.get("batch_id"),
        user_id: row.get("user_id"),
        collector_name: row.get("collector_name"),
        collection_datetime: row.get("collection_datetime"),
        ethanol: row.get("ethanol"),
        ammonia: row.get("ammonia"),
        h2s: row.get("h2s"),
        grade: row.get("grade"),
        shelf_life: row.get("shelf_life"),
        saved_at: row.get("saved_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup() -> (SqlitePool, SqlxHistoryRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let user_id = sqlx::query(
            "INSERT INTO users (email, name, password_hash, security_question_id, security_answer_hash) \
             VALUES ('h@x.com', 'H', 'hash', 1, 'digest')",
        )
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let repo = SqlxHistoryRepository::new(pool.clone());
        (pool, repo, user_id)
    }

    fn snapshot(batch_id: &str) -> SaveHistoryInput {
        SaveHistoryInput {
            batch_id: batch_id.to_string(),
            collector_name: "Collector".to_string(),
            collection_datetime: "2026-03-01 08:30".to_string(),
            ethanol: 220.0,
            ammonia: 12.0,
            h2s: 4.0,
            grade: "SPOILED".to_string(),
            shelf_life: 0.0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (_pool, repo, user_id) = setup().await;

        let saved = repo.insert(user_id, &snapshot("MB-1")).await.unwrap();
        assert!(saved.id > 0);

        let found = repo.get(user_id, saved.id).await.unwrap().unwrap();
        assert_eq!(found.batch_id, "MB-1");
        assert_eq!(found.grade, "SPOILED");
    }

    #[tokio::test]
    async fn test_duplicate_snapshot_is_unique_violation() {
        let (_pool, repo, user_id) = setup().await;
        repo.insert(user_id, &snapshot("MB-2")).await.unwrap();

        let err = repo.insert(user_id, &snapshot("MB-2")).await.unwrap_err();
        assert!(crate::db::repositories::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_get_scoped_to_user() {
        let (_pool, repo, user_id) = setup().await;
        let saved = repo.insert(user_id, &snapshot("MB-3")).await.unwrap();

        assert!(repo.get(user_id + 1, saved.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_rows_removed() {
        let (_pool, repo, user_id) = setup().await;
        let saved = repo.insert(user_id, &snapshot("MB-4")).await.unwrap();

        assert_eq!(repo.delete(user_id, saved.id).await.unwrap(), 1);
        assert_eq!(repo.delete(user_id, saved.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_pool, repo, user_id) = setup().await;
        repo.insert(user_id, &snapshot("MB-5")).await.unwrap();
        repo.insert(user_id, &snapshot("MB-6")).await.unwrap();

        let entries = repo.list(user_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].id > entries[1].id);
    }
}
