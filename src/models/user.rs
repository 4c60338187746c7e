//! User and security-question models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
///
/// Passwords are stored as argon2id PHC strings. The security answer is stored
/// as an exact-match digest (SHA-256 of the answer bytes), never verbatim.
/// Neither field is ever serialized into a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Display name
    pub name: String,
    /// Password hash (argon2id)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Selected security question from the catalog
    pub security_question_id: i64,
    /// Exact-match digest of the security answer
    #[serde(skip_serializing)]
    pub security_answer_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User. The password and answer must already be hashed.
    pub fn new(
        email: String,
        name: String,
        password_hash: String,
        security_question_id: i64,
        security_answer_hash: String,
    ) -> Self {
        Self {
            id: 0, // Set by the database
            email,
            name,
            password_hash,
            security_question_id,
            security_answer_hash,
            created_at: Utc::now(),
        }
    }
}

/// Static catalog entry for password-recovery questions.
///
/// Read-only reference data, seeded by migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityQuestion {
    pub id: i64,
    pub question: String,
}
