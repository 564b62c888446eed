//! One-shot account tokens and the email history ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A pending email validation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailToken {
    /// The random token value.
    pub token: String,
    /// The account being validated.
    pub user_id: Uuid,
    /// The address the token was sent to.
    pub email: String,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl EmailToken {
    /// Whether the token is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A pending password reset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordResetToken {
    /// The random token value.
    pub token: String,
    /// The account whose password may be reset.
    pub user_id: Uuid,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Whether the token is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An address a user has held, with whether it was ever validated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}
