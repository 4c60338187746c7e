//! User service
//!
//! Registration, login, logout, and session validation. Sessions are opaque
//! uuid tokens stored server-side with a fixed expiry; expired sessions are
//! rejected on use and removed lazily.

use crate::db::repositories::{
    is_unique_violation, SecurityQuestionRepository, SessionRepository, UserRepository,
};
use crate::models::{Session, User};
use crate::services::password::{hash_answer, hash_password, verify_password};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Minimum password length accepted at signup and reset
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An account already exists for the email
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Session expired
    #[error("Session expired")]
    SessionExpired,

    /// Session not found
    #[error("Session not found")]
    SessionNotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Registration input
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub security_question_id: i64,
    pub security_answer: String,
}

/// User service for account management and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    question_repo: Arc<dyn SecurityQuestionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        question_repo: Arc<dyn SecurityQuestionRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            question_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Register a new user account and open its first session.
    ///
    /// The chosen security question must exist in the catalog; the answer is
    /// stored as a digest and the password as an Argon2id hash.
    pub async fn signup(&self, input: SignupInput) -> Result<(User, Session), UserServiceError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "A valid email address is required".to_string(),
            ));
        }

        let name = input.name.trim();
        if name.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Name cannot be empty".to_string(),
            ));
        }

        if input.password.len() < MIN_PASSWORD_LENGTH {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        if input.security_answer.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Security answer cannot be empty".to_string(),
            ));
        }

        if self
            .question_repo
            .get_by_id(input.security_question_id)
            .await?
            .is_none()
        {
            return Err(UserServiceError::ValidationError(
                "Unknown security question".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let answer_hash = hash_answer(&input.security_answer);

        let user = User::new(
            email.clone(),
            name.to_string(),
            password_hash,
            input.security_question_id,
            answer_hash,
        );

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(UserServiceError::EmailTaken(email)),
            Err(e) => return Err(e.into()),
        };

        let session = self.open_session(created.id).await?;

        tracing::info!(user_id = created.id, email = %created.email, "User registered");
        Ok((created, session))
    }

    /// Authenticate a user and open a session.
    ///
    /// The same error is returned for an unknown email and a wrong password.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let email = email.trim().to_lowercase();

        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError("Invalid email or password".to_string())
            })?;

        if !verify_password(password, &user.password_hash)? {
            return Err(UserServiceError::AuthenticationError(
                "Invalid email or password".to_string(),
            ));
        }

        let session = self.open_session(user.id).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    async fn open_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };
        self.session_repo.create(&session).await?;
        Ok(session)
    }

    /// Close a session. Unknown tokens are ignored.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo.delete(session_id).await?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// An expired session is deleted on sight and reported as expired.
    pub async fn validate_session(&self, session_id: &str) -> Result<User, UserServiceError> {
        let session = self
            .session_repo
            .get_by_id(session_id)
            .await?
            .ok_or(UserServiceError::SessionNotFound)?;

        if session.is_expired() {
            self.session_repo.delete(session_id).await?;
            return Err(UserServiceError::SessionExpired);
        }

        self.user_repo
            .get_by_id(session.user_id)
            .await?
            .ok_or(UserServiceError::SessionNotFound)
    }

    /// Remove expired sessions. Intended to run periodically.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self.session_repo.delete_expired().await?;
        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired sessions");
        }
        Ok(removed)
    }
}
