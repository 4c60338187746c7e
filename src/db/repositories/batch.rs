//! Batch repository

use crate::models::{Batch, BatchStatus, BatchWithStats, CreateBatchInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Batch repository trait
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Register a new batch for a user
    async fn create(&self, user_id: i64, input: &CreateBatchInput) -> Result<Batch>;

    /// List a user's batches with derived reading statistics, newest first
    async fn list(&self, user_id: i64) -> Result<Vec<BatchWithStats>>;

    /// Get one of a user's batches by its batch identifier
    async fn get(&self, user_id: i64, batch_id: &str) -> Result<Option<BatchWithStats>>;

    /// Set a batch's status, returning the number of rows updated
    async fn update_status(&self, user_id: i64, batch_id: &str, status: BatchStatus)
        -> Result<u64>;

    /// Delete a batch and its sensor readings, returning the number of
    /// batch rows removed. Archived history is untouched.
    async fn delete(&self, user_id: i64, batch_id: &str) -> Result<u64>;
}

/// SQLx-based batch repository implementation
pub struct SqlxBatchRepository {
    pool: SqlitePool,
}

impl SqlxBatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn BatchRepository> {
        Arc::new(Self::new(pool))
    }
}

// Reading statistics are computed per row at query time; batches are few per
// user so correlated subqueries are fine here.
const BATCH_WITH_STATS: &str = r#"
    SELECT b.id, b.batch_id, b.user_id, b.collector_name, b.collection_datetime,
           b.status, b.created_at,
           (SELECT COUNT(*) FROM sensor_readings r
             WHERE r.batch_id = b.batch_id) AS reading_count,
           (SELECT r.predicted_shelf_life FROM sensor_readings r
             WHERE r.batch_id = b.batch_id
             ORDER BY r.created_at DESC, r.id DESC LIMIT 1) AS latest_shelf_life
    FROM batches b
"#;

#[async_trait]
impl BatchRepository for SqlxBatchRepository {
    async fn create(&self, user_id: i64, input: &CreateBatchInput) -> Result<Batch> {
        let now = Utc::now();
        let status = BatchStatus::default();

        let result = sqlx::query(
            r#"
            INSERT INTO batches (batch_id, user_id, collector_name, collection_datetime, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.batch_id)
        .bind(user_id)
        .bind(&input.collector_name)
        .bind(&input.collection_datetime)
        .bind(status.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create batch")?;

        Ok(Batch {
            id: result.last_insert_rowid(),
            batch_id: input.batch_id.clone(),
            user_id,
            collector_name: input.collector_name.clone(),
            collection_datetime: input.collection_datetime.clone(),
            status,
            created_at: now,
        })
    }

    async fn list(&self, user_id: i64) -> Result<Vec<BatchWithStats>> {
        let sql = format!(
            "{} WHERE b.user_id = ? ORDER BY b.created_at DESC, b.id DESC",
            BATCH_WITH_STATS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list batches")?;

        rows.iter().map(row_to_batch_with_stats).collect()
    }

    async fn get(&self, user_id: i64, batch_id: &str) -> Result<Option<BatchWithStats>> {
        let sql = format!("{} WHERE b.user_id = ? AND b.batch_id = ?", BATCH_WITH_STATS);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get batch")?;

        row.as_ref().map(row_to_batch_with_stats).transpose()
    }

    async fn update_status(
        &self,
        user_id: i64,
        batch_id: &str,
        status: BatchStatus,
    ) -> Result<u64> {
        let result =
            sqlx::query("UPDATE batches SET status = ? WHERE user_id = ? AND batch_id = ?")
                .bind(status.to_string())
                .bind(user_id)
                .bind(batch_id)
                .execute(&self.pool)
                .await
                .context("Failed to update batch status")?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, user_id: i64, batch_id: &str) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin batch delete transaction")?;

        let removed = sqlx::query("DELETE FROM batches WHERE user_id = ? AND batch_id = ?")
            .bind(user_id)
            .bind(batch_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete batch")?
            .rows_affected();

        // Readings go with the batch only when the batch actually belonged
        // to this user
        if removed > 0 {
            sqlx::query("DELETE FROM sensor_readings WHERE batch_id = ?")
                .bind(batch_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete batch readings")?;
        }

        tx.commit()
            .await
            .context("Failed to commit batch delete transaction")?;

        Ok(removed)
    }
}

fn row_to_batch_with_stats(row: &sqlx::sqlite::SqliteRow) -> Result<BatchWithStats> {
    let status: String = row.get("status");

    Ok(BatchWithStats {
        batch: Batch {
            id: row.get("id"),
            batch_id: row.get("batch_id"),
            user_id: row.get("user_id"),
            collector_name: row.get("collector_name"),
            collection_datetime: row.get("collection_datetime"),
            status: BatchStatus::from_str(&status)?,
            created_at: row.get("created_at"),
        },
        reading_count: row.get("reading_count"),
        latest_shelf_life: row.get("latest_shelf_life"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup() -> (SqlitePool, SqlxBatchRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let user_id = sqlx::query(
            "INSERT INTO users (email, name, password_hash, security_question_id, security_answer_hash) \
             VALUES ('b@x.com', 'B', 'hash', 1, 'digest')",
        )
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let repo = SqlxBatchRepository::new(pool.clone());
        (pool, repo, user_id)
    }

    fn input(batch_id: &str) -> CreateBatchInput {
        CreateBatchInput {
            batch_id: batch_id.to_string(),
            collector_name: "Collector".to_string(),
            collection_datetime: "2026-03-01 08:30".to_string(),
        }
    }

    async fn insert_reading(pool: &SqlitePool, batch_id: &str, shelf_life: f64) {
        sqlx::query(
            "INSERT INTO sensor_readings (batch_id, ethanol, ammonia, h2s, status, predicted_shelf_life, created_at) \
             VALUES (?, 10.0, 2.0, 1.0, 'good', ?, ?)",
        )
        .bind(batch_id)
        .bind(shelf_life)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_batch_defaults_to_good() {
        let (_pool, repo, user_id) = setup().await;

        let batch = repo.create(user_id, &input("MB-100")).await.unwrap();
        assert!(batch.id > 0);
        assert_eq!(batch.status, BatchStatus::Good);
    }

    #[tokio::test]
    async fn test_duplicate_batch_id_is_unique_violation() {
        let (_pool, repo, user_id) = setup().await;
        repo.create(user_id, &input("MB-101")).await.unwrap();

        let err = repo.create(user_id, &input("MB-101")).await.unwrap_err();
        assert!(crate::db::repositories::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_get_includes_reading_stats() {
        let (pool, repo, user_id) = setup().await;
        repo.create(user_id, &input("MB-102")).await.unwrap();

        insert_reading(&pool, "MB-102", 5.0).await;
        insert_reading(&pool, "MB-102", 3.5).await;

        let found = repo.get(user_id, "MB-102").await.unwrap().unwrap();
        assert_eq!(found.reading_count, 2);
        assert_eq!(found.latest_shelf_life, Some(3.5));
    }

    #[tokio::test]
    async fn test_get_without_readings_has_no_shelf_life() {
        let (_pool, repo, user_id) = setup().await;
        repo.create(user_id, &input("MB-103")).await.unwrap();

        let found = repo.get(user_id, "MB-103").await.unwrap().unwrap();
        assert_eq!(found.reading_count, 0);
        assert!(found.latest_shelf_life.is_none());
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let (pool, repo, user_id) = setup().await;
        let other = sqlx::query(
            "INSERT INTO users (email, name, password_hash, security_question_id, security_answer_hash) \
             VALUES ('o@x.com', 'O', 'hash', 1, 'digest')",
        )
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        repo.create(user_id, &input("MB-104")).await.unwrap();
        repo.create(other, &input("MB-105")).await.unwrap();

        let mine = repo.list(user_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].batch.batch_id, "MB-104");
    }

    #[tokio::test]
    async fn test_update_status_reports_missing_batch() {
        let (_pool, repo, user_id) = setup().await;
        repo.create(user_id, &input("MB-106")).await.unwrap();

        let updated = repo
            .update_status(user_id, "MB-106", BatchStatus::Spoiled)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let found = repo.get(user_id, "MB-106").await.unwrap().unwrap();
        assert_eq!(found.batch.status, BatchStatus::Spoiled);

        let missing = repo
            .update_status(user_id, "MB-999", BatchStatus::Spoiled)
            .await
            .unwrap();
        assert_eq!(missing, 0);
    }

    #[tokio::test]
    async fn test_delete_removes_readings_but_not_history() {
        let (pool, repo, user_id) = setup().await;
        repo.create(user_id, &input("MB-107")).await.unwrap();
        insert_reading(&pool, "MB-107", 4.0).await;

        sqlx::query(
            "INSERT INTO batch_history (batch_id, user_id, collector_name, collection_datetime, \
             ethanol, ammonia, h2s, grade, shelf_life, saved_at) \
             VALUES ('MB-107', ?, 'Collector', '2026-03-01 08:30', 10.0, 2.0, 1.0, 'GOOD', 4.0, ?)",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let removed = repo.delete(user_id, "MB-107").await.unwrap();
        assert_eq!(removed, 1);

        let readings: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sensor_readings WHERE batch_id = 'MB-107'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(readings, 0);

        let history: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM batch_history WHERE batch_id = 'MB-107'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(history, 1);
    }

    #[tokio::test]
    async fn test_delete_other_users_batch_keeps_readings() {
        let (pool, repo, user_id) = setup().await;
        repo.create(user_id, &input("MB-108")).await.unwrap();
        insert_reading(&pool, "MB-108", 4.0).await;

        let removed = repo.delete(user_id + 1, "MB-108").await.unwrap();
        assert_eq!(removed, 0);

        let readings: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sensor_readings WHERE batch_id = 'MB-108'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(readings, 1);
    }
}
