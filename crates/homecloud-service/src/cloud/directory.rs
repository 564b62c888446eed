//! Directory operations and namespace browsing.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use homecloud_core::error::AppError;
use homecloud_core::result::AppResult;
use homecloud_entity::cloud::{
    CloudFile, CreateDirectory, Directory, NamespaceTree, NodeKind, PathResolver, TreeEntry,
};

use super::namespace::{Namespace, NodeChange};
use crate::context::RequestContext;

/// Contents of one directory level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub directories: Vec<Directory>,
    pub files: Vec<CloudFile>,
}

/// What a virtual path points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "lowercase")]
pub enum LookupResult {
    /// The owner root (`alice/`).
    Root,
    Directory(Directory),
    File(CloudFile),
}

#[derive(Debug, Clone)]
pub struct DirectoryService {
    ns: Namespace,
}

impl DirectoryService {
    pub fn new(ns: Namespace) -> Self {
        Self { ns }
    }

    /// Create a directory under `parent_id`, or at the root.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Directory> {
        let owner = self.ns.owner(ctx).await?;
        let parent = match parent_id {
            Some(id) => Some(self.ns.writable_directory(ctx, id).await?),
            None => None,
        };
        let name = name.trim();
        let placement = self
            .ns
            .placement(&owner, parent.as_ref(), name, NodeKind::Directory)
            .await?;

        let dir = self
            .ns
            .db
            .cloud
            .create_directory(&CreateDirectory {
                owner_id: owner.user_id,
                parent_id,
                name: placement.name,
                virtual_name: name.to_string(),
                path: placement.paths.path,
                virtual_path: placement.paths.virtual_path,
            })
            .await?;
        info!(dir_id = %dir.id, virtual_path = %dir.virtual_path, "Directory created");
        Ok(dir)
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Directory> {
        self.ns.readable_directory(ctx, id).await
    }

    async fn listing(&self, owner_id: Uuid, parent_id: Option<Uuid>) -> AppResult<Listing> {
        let mut directories = self
            .ns
            .db
            .cloud
            .list_child_directories(owner_id, parent_id)
            .await?;
        let mut files = self.ns.db.cloud.list_child_files(owner_id, parent_id).await?;
        directories.sort_by(|a, b| a.virtual_name.cmp(&b.virtual_name));
        files.sort_by(|a, b| a.virtual_name.cmp(&b.virtual_name));
        Ok(Listing { directories, files })
    }

    /// Direct children of a directory.
    pub async fn children(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Listing> {
        let dir = self.ns.readable_directory(ctx, id).await?;
        self.listing(dir.owner_id, Some(dir.id)).await
    }

    /// Top level of the caller's namespace.
    pub async fn root(&self, ctx: &RequestContext) -> AppResult<Listing> {
        let owner = self.ns.owner(ctx).await?;
        self.listing(owner.user_id, None).await
    }

    /// The caller's whole namespace as a nested listing.
    pub async fn tree(&self, ctx: &RequestContext) -> AppResult<Vec<TreeEntry>> {
        let owner = self.ns.owner(ctx).await?;
        let dirs = self.ns.db.cloud.list_directories(owner.user_id).await?;
        let files = self.ns.db.cloud.list_files(owner.user_id).await?;
        let tree = NamespaceTree::build(&dirs, &files);
        Ok(tree.entries(&PathResolver::new(&owner)))
    }

    /// Rename and/or move a directory.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        change: NodeChange,
    ) -> AppResult<Directory> {
        self.ns.writable_directory(ctx, id).await?;
        if !change.is_empty() {
            self.ns.relocate(ctx, NodeKind::Directory, id, change).await?;
            info!(dir_id = %id, "Directory updated");
        }
        self.ns.directory(id).await
    }

    /// Delete a directory, its subtree, and all backing content.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        let dir = self.ns.writable_directory(ctx, id).await?;

        let files = self.ns.db.cloud.list_files(dir.owner_id).await?;
        let dirs = self.ns.db.cloud.list_directories(dir.owner_id).await?;
        let tree = NamespaceTree::build(&dirs, &files);
        if let Some(node) = tree.get(dir.id) {
            let below: Vec<Uuid> = tree
                .descendants(node)
                .into_iter()
                .map(|n| tree.node(n).id)
                .collect();
            let mut removed = Vec::new();
            for file in files.iter().filter(|f| f.uploaded && below.contains(&f.id)) {
                if let Err(e) = self.ns.storage.delete(&file.path).await {
                    self.forget_content(&removed).await;
                    warn!(dir_id = %dir.id, error = %e, "Directory delete aborted");
                    return Err(e);
                }
                removed.push(file.id);
            }
        }
        // Only leftovers remain under the prefix once every file is gone.
        if let Err(e) = self.ns.storage.delete_prefix(&dir.path).await {
            warn!(prefix = %dir.path, error = %e, "Failed to clear directory prefix");
        }

        self.ns.db.cloud.delete_directory(dir.id).await?;
        info!(dir_id = %dir.id, virtual_path = %dir.virtual_path, "Directory deleted");
        Ok(())
    }

    /// Mark files whose objects are already gone as having no content.
    async fn forget_content(&self, ids: &[Uuid]) {
        for id in ids {
            if let Err(e) = self.ns.db.cloud.clear_file_content(*id).await {
                warn!(file_id = %id, error = %e, "Failed to clear file content");
            }
        }
    }

    /// Resolve a virtual path in the caller's namespace.
    ///
    /// The leading username segment is optional, but a path that starts
    /// with it is always taken as fully qualified: `alice` is the root and
    /// a top-level directory named `alice` is `alice/alice`.
    pub async fn lookup(&self, ctx: &RequestContext, virtual_path: &str) -> AppResult<LookupResult> {
        let owner = self.ns.owner(ctx).await?;
        let trimmed = virtual_path.trim().trim_matches('/');
        if trimmed.is_empty() || trimmed == owner.username {
            return Ok(LookupResult::Root);
        }
        let qualified = if trimmed.starts_with(&owner.virtual_root()) {
            trimmed.to_string()
        } else {
            format!("{}{trimmed}", owner.virtual_root())
        };

        if let Some(dir) = self
            .ns
            .db
            .cloud
            .find_directory_by_virtual_path(owner.user_id, &format!("{qualified}/"))
            .await?
        {
            return Ok(LookupResult::Directory(dir));
        }
        if let Some(file) = self
            .ns
            .db
            .cloud
            .find_file_by_virtual_path(owner.user_id, &qualified)
            .await?
        {
            return Ok(LookupResult::File(file));
        }
        Err(AppError::not_found(format!("Nothing exists at '{qualified}'")))
    }
}
