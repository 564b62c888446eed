//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::UserRole;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name. Also the first segment of every virtual path.
    pub username: String,
    /// Current email address.
    pub email: String,
    /// Whether `email` has been confirmed through a validation token.
    pub email_validated: bool,
    /// When the last validation email was issued (drives the resend cooldown).
    pub email_sent_at: Option<DateTime<Utc>>,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Optional nickname shown instead of the username.
    pub nick: Option<String>,
    /// Preferred interface language code.
    pub language: String,
    /// Set when a cropped avatar exists; doubles as a cache-busting version.
    pub avatar_updated_at: Option<DateTime<Utc>>,
    /// Account role.
    pub role: UserRole,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name shown to other users: the nick when set, otherwise the username.
    pub fn display_name(&self) -> &str {
        match self.nick.as_deref() {
            Some(nick) if !nick.trim().is_empty() => nick,
            _ => &self.username,
        }
    }

    /// Per-user upload area for account assets.
    pub fn home_path(&self) -> String {
        format!("user_uploads/{}/", self.id)
    }

    /// Prefix under which avatar renditions are stored.
    pub fn avatar_path(&self) -> String {
        format!("{}avatar/", self.home_path())
    }

    /// Check if this user has admin privileges.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Initial language.
    pub language: String,
    /// Assigned role.
    pub role: UserRole,
}

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    /// New nickname. `Some("")` clears it.
    pub nick: Option<String>,
    /// New language code.
    pub language: Option<String>,
}
