//! Password-reset token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived single-use credential authorizing one password change.
///
/// At most one live token exists per user; reissuing replaces the prior one.
/// Consumption deletes the row, so a token can never be replayed even inside
/// its expiry window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    /// Target user
    pub user_id: i64,
    /// 256-bit random token, hex encoded
    pub token: String,
    /// Absolute expiry (issuance + 10 minutes)
    pub expires_at: DateTime<Utc>,
    /// Issuance timestamp
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
