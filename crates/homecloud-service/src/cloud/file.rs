//! File records: registration, rename/move, and deletion.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use homecloud_core::error::{AppError, codes};
use homecloud_core::result::AppResult;
use homecloud_entity::cloud::{CloudFile, CreateFile, NodeKind};
use homecloud_storage::checksum::parse_checksum;

use super::namespace::{Namespace, NodeChange};
use crate::context::RequestContext;

/// Input for registering a file before its content is uploaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterFile {
    pub parent_id: Option<Uuid>,
    pub name: String,
    /// Expected size in bytes, if known.
    pub size_bytes: Option<i64>,
    /// Expected hex SHA-256 of the content; the first upload must match it.
    pub checksum: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileService {
    ns: Namespace,
}

impl FileService {
    pub fn new(ns: Namespace) -> Self {
        Self { ns }
    }

    pub async fn register(&self, ctx: &RequestContext, input: RegisterFile) -> AppResult<CloudFile> {
        let size_bytes = input.size_bytes.unwrap_or(0);
        if size_bytes < 0 {
            return Err(AppError::validation("File size cannot be negative"));
        }
        let checksum = input.checksum.as_deref().map(parse_checksum).transpose()?;

        let owner = self.ns.owner(ctx).await?;
        let parent = match input.parent_id {
            Some(id) => Some(self.ns.writable_directory(ctx, id).await?),
            None => None,
        };
        let name = input.name.trim();
        let placement = self
            .ns
            .placement(&owner, parent.as_ref(), name, NodeKind::File)
            .await?;

        let file = self
            .ns
            .db
            .cloud
            .create_file(&CreateFile {
                owner_id: owner.user_id,
                parent_id: input.parent_id,
                name: placement.name,
                virtual_name: name.to_string(),
                path: placement.paths.path,
                virtual_path: placement.paths.virtual_path,
                size_bytes,
                checksum,
            })
            .await?;
        info!(file_id = %file.id, virtual_path = %file.virtual_path, "File registered");
        Ok(file)
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> AppResult<CloudFile> {
        self.ns.readable_file(ctx, id).await
    }

    /// Rename and/or move a file.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        change: NodeChange,
    ) -> AppResult<CloudFile> {
        self.ns.writable_file(ctx, id).await?;
        if !change.is_empty() {
            self.ns.relocate(ctx, NodeKind::File, id, change).await?;
            info!(file_id = %id, "File updated");
        }
        self.ns.file(id).await
    }

    /// Delete the backing object, then the record.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        let file = self.ns.writable_file(ctx, id).await?;
        self.ns.storage.delete(&file.path).await?;
        self.ns.db.cloud.delete_file(file.id).await?;
        info!(file_id = %file.id, virtual_path = %file.virtual_path, "File deleted");
        Ok(())
    }

    /// Drop the uploaded content but keep the record.
    pub async fn delete_content(&self, ctx: &RequestContext, id: Uuid) -> AppResult<CloudFile> {
        let file = self.ns.writable_file(ctx, id).await?;
        if !file.uploaded {
            return Err(AppError::not_found("This file has no uploaded content")
                .with_code(codes::FILE_NOT_UPLOADED));
        }
        self.ns.storage.delete(&file.path).await?;
        let file = self.ns.db.cloud.clear_file_content(file.id).await?;
        info!(file_id = %file.id, "File content deleted");
        Ok(file)
    }
}
