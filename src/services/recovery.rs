//! Account recovery service
//!
//! Password recovery by security question: look up the question for an
//! email, verify the answer, then spend the issued reset token on a password
//! change. Tokens are 256-bit random values with a short expiry; a user has
//! at most one live token, and issuing a new one replaces the old.
//!
//! Token writes go through transactions on the pool directly rather than a
//! repository, so replace-and-issue and verify-reset-invalidate stay atomic.

use crate::db::repositories::{SecurityQuestionRepository, UserRepository};
use crate::models::{ResetToken, SecurityQuestion};
use crate::services::password::{hash_answer, hash_password};
use crate::services::user::MIN_PASSWORD_LENGTH;
use anyhow::Context;
use chrono::{Duration, Utc};
use data_encoding::HEXLOWER;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Reset token lifetime in minutes
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Reset token length in bytes before hex encoding
const RESET_TOKEN_BYTES: usize = 32;

/// Error types for recovery operations
#[derive(Debug, thiserror::Error)]
pub enum RecoveryServiceError {
    /// No account for the given email
    #[error("No account found for that email")]
    UnknownEmail,

    /// Security answer did not match
    #[error("Security answer is incorrect")]
    IncorrectAnswer,

    /// Token unknown, already spent, or expired
    #[error("Reset token is invalid or expired")]
    InvalidToken,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Recovery service for the security-question reset flow
pub struct RecoveryService {
    pool: SqlitePool,
    user_repo: Arc<dyn UserRepository>,
    question_repo: Arc<dyn SecurityQuestionRepository>,
}

impl RecoveryService {
    pub fn new(
        pool: SqlitePool,
        user_repo: Arc<dyn UserRepository>,
        question_repo: Arc<dyn SecurityQuestionRepository>,
    ) -> Self {
        Self {
            pool,
            user_repo,
            question_repo,
        }
    }

    /// The question catalog shown at signup.
    pub async fn list_questions(&self) -> Result<Vec<SecurityQuestion>, RecoveryServiceError> {
        Ok(self.question_repo.list().await?)
    }

    /// Security question registered for an email.
    pub async fn question_for(
        &self,
        email: &str,
    ) -> Result<SecurityQuestion, RecoveryServiceError> {
        let email = email.trim().to_lowercase();
        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or(RecoveryServiceError::UnknownEmail)?;

        self.question_repo
            .get_by_id(user.security_question_id)
            .await?
            .ok_or_else(|| {
                RecoveryServiceError::InternalError(anyhow::anyhow!(
                    "User {} references a missing security question",
                    user.id
                ))
            })
    }

    /// Verify a security answer and issue a reset token.
    ///
    /// The answer must match exactly. On success any previous token for the
    /// user is replaced in the same transaction that stores the new one.
    pub async fn verify_answer(
        &self,
        email: &str,
        answer: &str,
    ) -> Result<String, RecoveryServiceError> {
        let email = email.trim().to_lowercase();
        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or(RecoveryServiceError::UnknownEmail)?;

        if hash_answer(answer) != user.security_answer_hash {
            tracing::warn!(user_id = user.id, "Failed security answer attempt");
            return Err(RecoveryServiceError::IncorrectAnswer);
        }

        let now = Utc::now();
        let reset = ResetToken {
            user_id: user.id,
            token: generate_token()?,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            created_at: now,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin token transaction")?;

        sqlx::query("DELETE FROM reset_tokens WHERE user_id = ?")
            .bind(reset.user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear previous reset token")?;

        sqlx::query(
            "INSERT INTO reset_tokens (user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(reset.user_id)
        .bind(&reset.token)
        .bind(reset.expires_at)
        .bind(reset.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to store reset token")?;

        tx.commit()
            .await
            .context("Failed to commit token transaction")?;

        tracing::info!(user_id = reset.user_id, "Reset token issued");
        Ok(reset.token)
    }

    /// Spend a reset token on a password change.
    ///
    /// The token is deleted in the same transaction as the password update,
    /// whether it was valid or expired, so it can never be used twice.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), RecoveryServiceError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(RecoveryServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        // Hash before opening the transaction; Argon2 is deliberately slow
        let password_hash = hash_password(new_password)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin reset transaction")?;

        let row = sqlx::query(
            "SELECT user_id, token, expires_at, created_at FROM reset_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to look up reset token")?;

        let Some(row) = row else {
            return Err(RecoveryServiceError::InvalidToken);
        };
        let reset = ResetToken {
            user_id: row.get("user_id"),
            token: row.get("token"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
        };

        sqlx::query("DELETE FROM reset_tokens WHERE user_id = ?")
            .bind(reset.user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete reset token")?;

        if reset.is_expired() {
            tx.commit()
                .await
                .context("Failed to commit expired-token cleanup")?;
            return Err(RecoveryServiceError::InvalidToken);
        }

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(reset.user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update password")?;

        tx.commit()
            .await
            .context("Failed to commit password reset")?;

        tracing::info!(user_id = reset.user_id, "Password reset completed");
        Ok(())
    }
}

fn generate_token() -> anyhow::Result<String> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    getrandom::getrandom(&mut bytes).context("Failed to generate reset token")?;
    Ok(HEXLOWER.encode(&bytes))
}
