//! Owner entity: the root of one user's namespace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The namespace root for a single user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Owner {
    /// The owning user. One owner per user.
    pub user_id: Uuid,
    /// Username, first segment of every virtual path.
    pub username: String,
    /// Physical prefix, e.g. `cloud/user/alice/`.
    pub root_path: String,
    /// When the namespace was created.
    pub created_at: DateTime<Utc>,
}

impl Owner {
    /// Build the owner record for a freshly registered user.
    pub fn for_user(user_id: Uuid, username: &str, root_prefix: &str) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            root_path: format!("{}/{}/", root_prefix.trim_end_matches('/'), username),
            created_at: Utc::now(),
        }
    }

    /// Virtual path of the namespace root.
    pub fn virtual_root(&self) -> String {
        format!("{}/", self.username)
    }
}
