//! Sensor reading repository
//!
//! Readings are append-only. `latest` and `history` order by insertion time
//! with the row id as a tiebreaker so same-timestamp rows stay stable.

use crate::models::{BatchStatus, SensorReading, Verdict};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Sensor reading repository trait
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Append a classified reading
    async fn insert(
        &self,
        batch_id: &str,
        ethanol: f64,
        ammonia: f64,
        h2s: f64,
        verdict: &Verdict,
    ) -> Result<SensorReading>;

    /// Most recent reading, optionally scoped to one batch
    async fn latest(&self, batch_id: Option<&str>) -> Result<Option<SensorReading>>;

    /// Recent readings for a batch, newest first
    async fn history(&self, batch_id: &str, limit: i64) -> Result<Vec<SensorReading>>;
}

/// SQLx-based sensor reading repository implementation
pub struct SqlxReadingRepository {
    pool: SqlitePool,
}

impl SqlxReadingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ReadingRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReadingRepository for SqlxReadingRepository {
    async fn insert(
        &self,
        batch_id: &str,
        ethanol: f64,
        ammonia: f64,
        h2s: f64,
        verdict: &Verdict,
    ) -> Result<SensorReading> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO sensor_readings (batch_id, ethanol, ammonia, h2s, status, predicted_shelf_life, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch_id)
        .bind(ethanol)
        .bind(ammonia)
        .bind(h2s)
        .bind(verdict.status.to_string())
        .bind(verdict.shelf_life)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to insert sensor reading")?;

        Ok(SensorReading {
            id: result.last_insert_rowid(),
            batch_id: batch_id.to_string(),
            ethanol,
            ammonia,
            h2s,
            status: verdict.status,
            predicted_shelf_life: verdict.shelf_life,
            created_at: now,
        })
    }

    async fn latest(&self, batch_id: Option<&str>) -> Result<Option<SensorReading>> {
        let row = match batch_id {
            Some(batch_id) => {
                sqlx::query(
                    "SELECT id, batch_id, ethanol, ammonia, h2s, status, predicted_shelf_life, created_at \
                     FROM sensor_readings WHERE batch_id = ? \
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                )
                .bind(batch_id)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, batch_id, ethanol, ammonia, h2s, status, predicted_shelf_life, created_at \
                     FROM sensor_readings \
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                )
                .fetch_optional(&self.pool)
                .await
            }
        }
        .context("Failed to get latest reading")?;

        row.as_ref().map(row_to_reading).transpose()
    }

    async fn history(&self, batch_id: &str, limit: i64) -> Result<Vec<SensorReading>> {
        let rows = sqlx::query(
            "SELECT id, batch_id, ethanol, ammonia, h2s, status, predicted_shelf_life, created_at \
             FROM sensor_readings WHERE batch_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(batch_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get reading history")?;

        rows.iter().map(row_to_reading).collect()
    }
}

fn row_to_reading(row: &sqlx::sqlite::SqliteRow) -> Result<SensorReading> {
    let status: String = row.get("status");

    Ok(SensorReading {
        id: row.get("id"),
        batch_id: row.get("batch_id"),
        ethanol: row.get("ethanol"),
        ammonia: row.get("ammonia"),
        h2s: row.get("h2s"),
        status: BatchStatus::from_str(&status)?,
        predicted_shelf_life: row.get("predicted_shelf_life"),
        created_at: row.get("created_at"),
    })
}
