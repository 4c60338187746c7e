//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod batch;
pub mod history;
pub mod reading;
pub mod security_question;
pub mod session;
pub mod user;

pub use batch::{BatchRepository, SqlxBatchRepository};
pub use history::{HistoryRepository, SqlxHistoryRepository};
pub use reading::{ReadingRepository, SqlxReadingRepository};
pub use security_question::{SecurityQuestionRepository, SqlxSecurityQuestionRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Check whether a repository error is a unique-constraint violation.
///
/// Uniqueness (email, batch id, one history row per batch) is enforced by the
/// schema; services use this to map storage rejections to conflict errors
/// without leaking driver detail.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
