//! Shared namespace plumbing: lookups, access checks, node placement, and
//! relocation of whole subtrees.

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use homecloud_core::config::cloud::CloudConfig;
use homecloud_core::error::{AppError, codes};
use homecloud_core::result::AppResult;
use homecloud_database::{Database, NodeUpdate};
use homecloud_entity::cloud::name::{
    available_stored_name, validate_virtual_name, validate_virtual_path_length,
};
use homecloud_entity::cloud::unique::ensure_unique;
use homecloud_entity::cloud::{
    CloudFile, Directory, NamespaceTree, NodeId, NodeKind, Owner, PathResolver, ResolvedPaths,
    Segment,
};
use homecloud_storage::StorageManager;

use crate::context::RequestContext;

/// Where a new node goes: its stored name and both derived paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub name: String,
    pub paths: ResolvedPaths,
}

/// Requested rename and/or move of one node.
///
/// `parent_id` is `None` to keep the parent, `Some(None)` to move to the
/// owner root, and `Some(Some(id))` to move under a directory.
#[derive(Debug, Clone, Default)]
pub struct NodeChange {
    pub name: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
}

impl NodeChange {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent_id.is_none()
    }
}

/// State shared by the directory, file, and transfer services.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub(crate) db: Database,
    pub(crate) storage: StorageManager,
    pub(crate) config: CloudConfig,
}

pub(crate) fn directory_not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Directory {id} does not exist"))
        .with_code(codes::DIRECTORY_DOES_NOT_EXIST)
}

pub(crate) fn file_not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("File {id} does not exist")).with_code(codes::FILE_DOES_NOT_EXIST)
}

fn no_read() -> AppError {
    AppError::authorization("You do not have read access to this object")
        .with_code(codes::NO_READ_PERMISSION)
}

fn no_write() -> AppError {
    AppError::authorization("You do not have write access to this object")
        .with_code(codes::NO_WRITE_PERMISSION)
}

impl Namespace {
    pub fn new(db: Database, storage: StorageManager, config: &CloudConfig) -> Self {
        Self {
            db,
            storage,
            config: config.clone(),
        }
    }

    /// The caller's namespace, created on first use.
    pub async fn owner(&self, ctx: &RequestContext) -> AppResult<Owner> {
        if let Some(owner) = self.db.cloud.find_owner(ctx.user_id).await? {
            return Ok(owner);
        }
        debug!(user_id = %ctx.user_id, "Creating cloud namespace on first access");
        self.db
            .cloud
            .create_owner(&Owner::for_user(
                ctx.user_id,
                &ctx.username,
                &self.config.root_prefix,
            ))
            .await
    }

    pub async fn directory(&self, id: Uuid) -> AppResult<Directory> {
        self.db
            .cloud
            .find_directory(id)
            .await?
            .ok_or_else(|| directory_not_found(id))
    }

    pub async fn file(&self, id: Uuid) -> AppResult<CloudFile> {
        self.db
            .cloud
            .find_file(id)
            .await?
            .ok_or_else(|| file_not_found(id))
    }

    pub async fn readable_directory(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Directory> {
        let dir = self.directory(id).await?;
        if dir.owner_id != ctx.user_id {
            return Err(no_read());
        }
        Ok(dir)
    }

    pub async fn writable_directory(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Directory> {
        let dir = self.directory(id).await?;
        if dir.owner_id != ctx.user_id {
            return Err(no_write());
        }
        Ok(dir)
    }

    pub async fn readable_file(&self, ctx: &RequestContext, id: Uuid) -> AppResult<CloudFile> {
        let file = self.file(id).await?;
        if file.owner_id != ctx.user_id {
            return Err(no_read());
        }
        Ok(file)
    }

    pub async fn writable_file(&self, ctx: &RequestContext, id: Uuid) -> AppResult<CloudFile> {
        let file = self.file(id).await?;
        if file.owner_id != ctx.user_id {
            return Err(no_write());
        }
        Ok(file)
    }

    /// Validate `virtual_name` for a new node under `parent` and work out
    /// its stored name and paths.
    pub async fn placement(
        &self,
        owner: &Owner,
        parent: Option<&Directory>,
        virtual_name: &str,
        kind: NodeKind,
    ) -> AppResult<Placement> {
        validate_virtual_name(virtual_name)?;

        let parent_id = parent.map(|d| d.id);
        let dirs = self
            .db
            .cloud
            .list_child_directories(owner.user_id, parent_id)
            .await?;
        let files = self.db.cloud.list_child_files(owner.user_id, parent_id).await?;

        let resolver = PathResolver::new(owner);
        let parent_paths = parent.map(|d| (d.path.as_str(), d.virtual_path.as_str()));
        let display = resolver.resolve_under(
            parent_paths,
            Segment::new(virtual_name, virtual_name),
            kind,
        );
        ensure_unique(
            &display.virtual_path,
            dirs.iter()
                .map(|d| d.virtual_path.as_str())
                .chain(files.iter().map(|f| f.virtual_path.as_str())),
        )?;
        validate_virtual_path_length(&display.virtual_path, self.config.max_virtual_path_length)?;

        let name = available_stored_name(
            virtual_name,
            dirs.iter()
                .map(|d| d.name.as_str())
                .chain(files.iter().map(|f| f.name.as_str())),
        );
        let paths =
            resolver.resolve_under(parent_paths, Segment::new(&name, virtual_name), kind);
        Ok(Placement { name, paths })
    }

    /// Rename and/or move a node, recomputing the paths of its whole
    /// subtree and relocating uploaded content in storage.
    pub async fn relocate(
        &self,
        ctx: &RequestContext,
        kind: NodeKind,
        id: Uuid,
        change: NodeChange,
    ) -> AppResult<()> {
        let owner = self.owner(ctx).await?;
        let dirs = self.db.cloud.list_directories(owner.user_id).await?;
        let files = self.db.cloud.list_files(owner.user_id).await?;
        let mut tree = NamespaceTree::build(&dirs, &files);
        let resolver = PathResolver::new(&owner);

        let not_found = || match kind {
            NodeKind::Directory => directory_not_found(id),
            NodeKind::File => file_not_found(id),
        };
        let node = tree
            .get(id)
            .filter(|n| tree.node(*n).kind == kind)
            .ok_or_else(not_found)?;

        let affected: Vec<NodeId> = std::iter::once(node)
            .chain(tree.descendants(node))
            .collect();
        let before: HashMap<NodeId, ResolvedPaths> = affected
            .iter()
            .map(|n| (*n, tree.resolve(*n, &resolver)))
            .collect();

        let mut moved = false;
        if let Some(destination) = change.parent_id {
            let target = match destination {
                Some(dest_id) => {
                    self.writable_directory(ctx, dest_id).await?;
                    Some(tree.get(dest_id).ok_or_else(|| directory_not_found(dest_id))?)
                }
                None => None,
            };
            if tree.node(node).parent != target {
                tree.reparent(node, target)?;
                moved = true;
            }
        }
        if let Some(name) = change.name.as_deref() {
            validate_virtual_name(name)?;
            tree.rename(node, name);
        }

        let siblings: Vec<NodeId> = tree
            .children(tree.node(node).parent)
            .iter()
            .copied()
            .filter(|s| *s != node)
            .collect();
        let candidate = tree.resolve(node, &resolver).virtual_path;
        let sibling_paths: Vec<String> = siblings
            .iter()
            .map(|s| tree.resolve(*s, &resolver).virtual_path)
            .collect();
        ensure_unique(&candidate, sibling_paths.iter().map(String::as_str))?;

        if moved {
            let taken: Vec<String> = siblings.iter().map(|s| tree.node(*s).name.clone()).collect();
            let current = tree.node(node).name.clone();
            let stored = available_stored_name(&current, taken.iter().map(String::as_str));
            if stored != current {
                debug!(%id, from = %current, to = %stored, "Stored name taken at destination");
                tree.set_stored_name(node, &stored);
            }
        }

        let mut updates = Vec::with_capacity(affected.len());
        for n in &affected {
            let paths = tree.resolve(*n, &resolver);
            validate_virtual_path_length(&paths.virtual_path, self.config.max_virtual_path_length)?;
            let entry = tree.node(*n);
            updates.push(NodeUpdate {
                id: entry.id,
                kind: entry.kind,
                parent_id: entry.parent.map(|p| tree.node(p).id),
                name: entry.name.clone(),
                virtual_name: entry.virtual_name.clone(),
                path: paths.path,
                virtual_path: paths.virtual_path,
            });
        }

        let uploaded: HashMap<Uuid, bool> = files.iter().map(|f| (f.id, f.uploaded)).collect();
        let mut relocated: Vec<(String, String)> = Vec::new();
        for (n, update) in affected.iter().zip(&updates) {
            let old = &before[n].path;
            if update.kind != NodeKind::File
                || !uploaded.get(&update.id).copied().unwrap_or(false)
                || *old == update.path
            {
                continue;
            }
            if let Err(e) = self.storage.rename(old, &update.path).await {
                self.undo_renames(&relocated).await;
                return Err(e);
            }
            relocated.push((old.clone(), update.path.clone()));
        }

        if let Err(e) = self.db.cloud.update_nodes(&updates).await {
            self.undo_renames(&relocated).await;
            return Err(e);
        }

        if moved && kind == NodeKind::Directory {
            let old_prefix = &before[&node].path;
            if let Err(e) = self.storage.delete_prefix(old_prefix).await {
                warn!(prefix = %old_prefix, error = %e, "Failed to clean up old directory prefix");
            }
        }

        debug!(%id, nodes = updates.len(), objects = relocated.len(), "Relocated namespace node");
        Ok(())
    }

    async fn undo_renames(&self, relocated: &[(String, String)]) {
        for (old, new) in relocated.iter().rev() {
            if let Err(e) = self.storage.rename(new, old).await {
                warn!(from = %new, to = %old, error = %e, "Failed to roll back object move");
            }
        }
    }
}
