//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Extensions served inline rather than as attachments.
const INLINE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "bmp", "gif", "webp", "svg", "ico"];

/// A leaf node in an owner's namespace.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CloudFile {
    /// Unique file identifier.
    pub id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    /// Containing directory (None for files at the owner root).
    pub parent_id: Option<Uuid>,
    /// Stored name, fixed at creation.
    pub name: String,
    /// Display name.
    pub virtual_name: String,
    /// Derived physical path; the backing object key.
    pub path: String,
    /// Derived virtual path.
    pub virtual_path: String,
    /// Content size in bytes (0 until uploaded unless declared).
    pub size_bytes: i64,
    /// Hex SHA-256 of the content. Before upload this is the checksum the
    /// client declared at registration, if any.
    pub checksum: Option<String>,
    /// Whether the backing object exists at `path`.
    pub uploaded: bool,
    /// MIME type reported at upload.
    pub content_type: Option<String>,
    /// When the file record was created.
    pub created_at: DateTime<Utc>,
    /// When the record or its content last changed.
    pub last_modified: DateTime<Utc>,
}

impl CloudFile {
    /// Lowercase extension of the display name, if any.
    pub fn extension(&self) -> Option<String> {
        self.virtual_name
            .rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_lowercase())
    }

    /// `Content-Disposition` value to serve this file with.
    pub fn content_disposition(&self) -> String {
        match self.extension() {
            Some(ext) if INLINE_EXTENSIONS.contains(&ext.as_str()) => "inline".to_string(),
            _ => format!(
                "attachment; filename=\"{}\"",
                self.virtual_name.replace('"', "")
            ),
        }
    }
}

/// Data required to insert a file record. Paths are already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    pub owner_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub virtual_name: String,
    pub path: String,
    pub virtual_path: String,
    pub size_bytes: i64,
    pub checksum: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> CloudFile {
        let now = Utc::now();
        CloudFile {
            id: Uuid::nil(),
            owner_id: Uuid::nil(),
            parent_id: None,
            name: name.to_string(),
            virtual_name: name.to_string(),
            path: format!("cloud/user/alice/{name}"),
            virtual_path: format!("alice/{name}"),
            size_bytes: 0,
            checksum: None,
            uploaded: false,
            content_type: None,
            created_at: now,
            last_modified: now,
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(file("photo.JPG").extension().as_deref(), Some("jpg"));
        assert_eq!(file("archive.tar.gz").extension().as_deref(), Some("gz"));
        assert_eq!(file("README").extension(), None);
        assert_eq!(file(".bashrc").extension(), None);
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(file("cat.png").content_disposition(), "inline");
        assert_eq!(
            file("report.pdf").content_disposition(),
            "attachment; filename=\"report.pdf\""
        );
    }
}
