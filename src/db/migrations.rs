//! Database migrations
//!
//! Code-embedded, versioned migrations for single-binary deployment. Each
//! migration is a `Migration` struct with a unique sequential version; applied
//! versions are tracked in the `schema_migrations` table and skipped on
//! subsequent runs.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements to apply
    pub up: &'static str,
}

/// All migrations for the engine, embedded in the binary.
pub const MIGRATIONS: &[Migration] = &[
    // Migration 1: security-question catalog (read-only reference data)
    Migration {
        version: 1,
        name: "create_security_questions",
        up: r#"
            CREATE TABLE IF NOT EXISTS security_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question VARCHAR(255) NOT NULL UNIQUE
            );
            INSERT OR IGNORE INTO security_questions (question) VALUES
                ('What was the name of your first pet?'),
                ('What city were you born in?'),
                ('What is your mother''s maiden name?'),
                ('What was the make of your first vehicle?'),
                ('What is the name of the street you grew up on?');
        "#,
    },
    // Migration 2: users
    Migration {
        version: 2,
        name: "create_users",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                security_question_id INTEGER NOT NULL,
                security_answer_hash VARCHAR(64) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (security_question_id) REFERENCES security_questions(id)
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
    },
    // Migration 3: sessions
    Migration {
        version: 3,
        name: "create_sessions",
        up: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    // Migration 4: reset tokens; PRIMARY KEY on user_id keeps at most one
    // live token per user
    Migration {
        version: 4,
        name: "create_reset_tokens",
        up: r#"
            CREATE TABLE IF NOT EXISTS reset_tokens (
                user_id INTEGER PRIMARY KEY,
                token VARCHAR(64) NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_reset_tokens_token ON reset_tokens(token);
        "#,
    },
    // Migration 5: batches; batch_id is unique across all users
    Migration {
        version: 5,
        name: "create_batches",
        up: r#"
            CREATE TABLE IF NOT EXISTS batches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id VARCHAR(100) NOT NULL UNIQUE,
                user_id INTEGER NOT NULL,
                collector_name VARCHAR(100) NOT NULL,
                collection_datetime VARCHAR(64) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'good',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_batches_user_id ON batches(user_id);
        "#,
    },
    // Migration 6: sensor readings; append-only, batch_id intentionally not
    // a foreign key (the DEFAULT id is allowed)
    Migration {
        version: 6,
        name: "create_sensor_readings",
        up: r#"
            CREATE TABLE IF NOT EXISTS sensor_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id VARCHAR(100) NOT NULL,
                ethanol REAL NOT NULL,
                ammonia REAL NOT NULL,
                h2s REAL NOT NULL,
                status VARCHAR(20) NOT NULL,
                predicted_shelf_life REAL NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_readings_batch_created
                ON sensor_readings(batch_id, created_at);
        "#,
    },
    // Migration 7: batch history; one snapshot per (user, batch)
    Migration {
        version: 7,
        name: "create_batch_history",
        up: r#"
            CREATE TABLE IF NOT EXISTS batch_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id VARCHAR(100) NOT NULL,
                user_id INTEGER NOT NULL,
                collector_name VARCHAR(100) NOT NULL,
                collection_datetime VARCHAR(64) NOT NULL,
                ethanol REAL NOT NULL,
                ammonia REAL NOT NULL,
                h2s REAL NOT NULL,
                grade VARCHAR(20) NOT NULL,
                shelf_life REAL NOT NULL,
                saved_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE (user_id, batch_id)
            );
            CREATE INDEX IF NOT EXISTS idx_history_user_saved
                ON batch_history(user_id, saved_at);
        "#,
    },
];

/// Run all pending migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_migrations_table(pool).await?;

    let applied = applied_versions(pool).await?;

    for migration in MIGRATIONS {
        if applied.contains(&(migration.version as i64)) {
            continue;
        }

        tracing::info!("Applying migration {}: {}", migration.version, migration.name);

        // SQLite executes one statement per query call
        for statement in split_statements(migration.up) {
            sqlx::query(&statement).execute(pool).await.with_context(|| {
                format!(
                    "Migration {} ({}) failed on statement: {}",
                    migration.version, migration.name, statement
                )
            })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to record migration {}", migration.version))?;
    }

    Ok(())
}

async fn create_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create schema_migrations table")?;

    Ok(())
}

async fn applied_versions(pool: &SqlitePool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows.iter().map(|row| row.get("version")).collect())
}

fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::create_pool;

    async fn raw_pool() -> SqlitePool {
        let config = DatabaseConfig {
            url: ":memory:".to_string(),
        };
        create_pool(&config).await.expect("Failed to create pool")
    }

    #[tokio::test]
    async fn test_migrations_create_all_tables() {
        let pool = raw_pool().await;
        run_migrations(&pool).await.expect("Migrations should succeed");

        for table in [
            "security_questions",
            "users",
            "sessions",
            "reset_tokens",
            "batches",
            "sensor_readings",
            "batch_history",
        ] {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("Failed to query sqlite_master");
            assert_eq!(count, 1, "table {} should exist", table);
        }
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = raw_pool().await;
        run_migrations(&pool).await.expect("First run should succeed");
        run_migrations(&pool).await.expect("Second run should succeed");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_security_questions_seeded() {
        let pool = raw_pool().await;
        run_migrations(&pool).await.expect("Migrations should succeed");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM security_questions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_batch_id_unique_across_users() {
        let pool = raw_pool().await;
        run_migrations(&pool).await.expect("Migrations should succeed");

        for (email, name) in [("a@x.com", "A"), ("b@x.com", "B")] {
            sqlx::query(
                "INSERT INTO users (email, name, password_hash, security_question_id, security_answer_hash) \
                 VALUES (?, ?, 'hash', 1, 'digest')",
            )
            .bind(email)
            .bind(name)
            .execute(&pool)
            .await
            .unwrap();
        }

        sqlx::query(
            "INSERT INTO batches (batch_id, user_id, collector_name, collection_datetime) \
             VALUES ('MB-001', 1, 'A', '2026-01-01 08:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        // Same batch_id under a different user must be rejected by the schema
        let result = sqlx::query(
            "INSERT INTO batches (batch_id, user_id, collector_name, collection_datetime) \
             VALUES ('MB-001', 2, 'B', '2026-01-02 08:00')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_versions_are_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i32 + 1);
        }
    }
}
