//! Security question repository
//!
//! The question catalog is seeded by migrations and read-only at runtime.

use crate::models::SecurityQuestion;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Security question repository trait
#[async_trait]
pub trait SecurityQuestionRepository: Send + Sync {
    /// List all questions in the catalog
    async fn list(&self) -> Result<Vec<SecurityQuestion>>;

    /// Get a question by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<SecurityQuestion>>;
}

/// SQLx-based security question repository implementation
pub struct SqlxSecurityQuestionRepository {
    pool: SqlitePool,
}

impl SqlxSecurityQuestionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn SecurityQuestionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SecurityQuestionRepository for SqlxSecurityQuestionRepository {
    async fn list(&self) -> Result<Vec<SecurityQuestion>> {
        let rows = sqlx::query("SELECT id, question FROM security_questions ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list security questions")?;

        Ok(rows
            .iter()
            .map(|row| SecurityQuestion {
                id: row.get("id"),
                question: row.get("question"),
            })
            .collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SecurityQuestion>> {
        let row = sqlx::query("SELECT id, question FROM security_questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get security question")?;

        Ok(row.map(|row| SecurityQuestion {
            id: row.get("id"),
            question: row.get("question"),
        }))
    }
}
