//! Directory entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A container node in an owner's namespace.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Directory {
    /// Unique directory identifier.
    pub id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    /// Parent directory (None for root-level directories).
    pub parent_id: Option<Uuid>,
    /// Stored name, fixed at creation.
    pub name: String,
    /// Display name.
    pub virtual_name: String,
    /// Derived physical path, always ending with `/`.
    pub path: String,
    /// Derived virtual path, always ending with `/`.
    pub virtual_path: String,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last modified.
    pub last_modified: DateTime<Utc>,
}

impl Directory {
    /// Check if this directory sits directly under the owner root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data required to insert a directory. Paths are already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectory {
    pub owner_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub virtual_name: String,
    pub path: String,
    pub virtual_path: String,
}
