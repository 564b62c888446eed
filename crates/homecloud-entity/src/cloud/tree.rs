//! Arena representation of one owner's namespace.
//!
//! Nodes live in a flat `Vec` and refer to each other through [`NodeId`]
//! indices; the `Uuid` index maps database ids to arena slots. Parent
//! links are plain indices, so the structure has no ownership cycles and
//! re-parenting is a constant-time edit after the cycle check.

use std::collections::HashMap;

use homecloud_core::error::codes;
use homecloud_core::{AppError, AppResult};
use serde::Serialize;
use uuid::Uuid;

use super::directory::Directory;
use super::file::CloudFile;
use super::path::{NodeKind, PathResolver, ResolvedPaths, Segment};

/// Index of a node inside a [`NamespaceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: Uuid,
    pub kind: NodeKind,
    pub name: String,
    pub virtual_name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Nested, serializable view of the tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub id: Uuid,
    pub kind: NodeKind,
    pub name: String,
    pub virtual_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeEntry>,
}

/// All directories and files of one owner.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTree {
    nodes: Vec<TreeNode>,
    index: HashMap<Uuid, NodeId>,
    roots: Vec<NodeId>,
}

impl NamespaceTree {
    /// Build the arena from flat rows. Nodes whose parent is absent from
    /// `directories` are attached to the root.
    pub fn build(directories: &[Directory], files: &[CloudFile]) -> Self {
        let mut tree = Self::default();
        let mut parents = Vec::with_capacity(directories.len() + files.len());

        for dir in directories {
            tree.push(dir.id, NodeKind::Directory, &dir.name, &dir.virtual_name);
            parents.push(dir.parent_id);
        }
        for file in files {
            tree.push(file.id, NodeKind::File, &file.name, &file.virtual_name);
            parents.push(file.parent_id);
        }

        for (slot, parent_id) in parents.into_iter().enumerate() {
            let node = NodeId(slot);
            let parent = parent_id
                .and_then(|pid| tree.index.get(&pid).copied())
                .filter(|p| tree.nodes[p.0].kind == NodeKind::Directory);
            tree.attach(node, parent);
        }
        tree
    }

    fn push(&mut self, id: Uuid, kind: NodeKind, name: &str, virtual_name: &str) {
        let slot = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            id,
            kind,
            name: name.to_string(),
            virtual_name: virtual_name.to_string(),
            parent: None,
            children: Vec::new(),
        });
        self.index.insert(id, slot);
    }

    fn attach(&mut self, node: NodeId, parent: Option<NodeId>) {
        self.nodes[node.0].parent = parent;
        match parent {
            Some(p) => self.nodes[p.0].children.push(node),
            None => self.roots.push(node),
        }
    }

    fn detach(&mut self, node: NodeId) {
        match self.nodes[node.0].parent {
            Some(p) => self.nodes[p.0].children.retain(|c| *c != node),
            None => self.roots.retain(|c| *c != node),
        }
        self.nodes[node.0].parent = None;
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the namespace holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Arena slot of a database id.
    pub fn get(&self, id: Uuid) -> Option<NodeId> {
        self.index.get(&id).copied()
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Direct children of `parent` (`None` for the owner root).
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(p) => &self.nodes[p.0].children,
            None => &self.roots,
        }
    }

    /// Ancestors of `id`, outermost first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes[id.0].parent;
        while let Some(p) = cursor {
            // Parent links only ever point at existing slots and reparent()
            // refuses cycles, so the walk is bounded by the arena size.
            if chain.len() >= self.nodes.len() {
                break;
            }
            chain.push(p);
            cursor = self.nodes[p.0].parent;
        }
        chain.reverse();
        chain
    }

    /// Whether `node` is `of` or lies anywhere below it.
    pub fn is_self_or_descendant(&self, node: NodeId, of: NodeId) -> bool {
        node == of || self.ancestors(node).contains(&of)
    }

    /// Every node below `id` in pre-order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Derived paths of `id` from its current position in the arena.
    pub fn resolve(&self, id: NodeId, resolver: &PathResolver<'_>) -> ResolvedPaths {
        let ancestors = self.ancestors(id);
        let segments: Vec<Segment<'_>> = ancestors
            .iter()
            .map(|a| {
                let n = &self.nodes[a.0];
                Segment::new(&n.name, &n.virtual_name)
            })
            .collect();
        let node = &self.nodes[id.0];
        resolver.resolve(
            &segments,
            Segment::new(&node.name, &node.virtual_name),
            node.kind,
        )
    }

    /// Move `id` under `new_parent` (`None` for the owner root).
    ///
    /// Fails with `invalid-move` when the destination is a file, or when it
    /// is `id` itself or one of its descendants.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> AppResult<()> {
        if let Some(p) = new_parent {
            if self.nodes[p.0].kind != NodeKind::Directory {
                return Err(AppError::validation("Destination is not a directory")
                    .with_code(codes::INVALID_MOVE));
            }
            if self.is_self_or_descendant(p, id) {
                return Err(AppError::validation(
                    "Cannot move a directory into itself or one of its subdirectories",
                )
                .with_code(codes::INVALID_MOVE));
            }
        }
        self.detach(id);
        self.attach(id, new_parent);
        Ok(())
    }

    /// Change the display name of `id`.
    pub fn rename(&mut self, id: NodeId, virtual_name: &str) {
        self.nodes[id.0].virtual_name = virtual_name.to_string();
    }

    /// Replace the stored name of `id`.
    pub fn set_stored_name(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].name = name.to_string();
    }

    /// Nested listing of the whole namespace. Directories sort before
    /// files, then by display name.
    pub fn entries(&self, resolver: &PathResolver<'_>) -> Vec<TreeEntry> {
        self.entries_of(&self.roots, resolver)
    }

    fn entries_of(&self, ids: &[NodeId], resolver: &PathResolver<'_>) -> Vec<TreeEntry> {
        let mut sorted: Vec<NodeId> = ids.to_vec();
        sorted.sort_by(|a, b| {
            let (a, b) = (&self.nodes[a.0], &self.nodes[b.0]);
            (a.kind != NodeKind::Directory, &a.virtual_name)
                .cmp(&(b.kind != NodeKind::Directory, &b.virtual_name))
        });
        sorted
            .into_iter()
            .map(|id| {
                let node = &self.nodes[id.0];
                TreeEntry {
                    id: node.id,
                    kind: node.kind,
                    name: node.virtual_name.clone(),
                    virtual_path: self.resolve(id, resolver).virtual_path,
                    children: self.entries_of(&node.children, resolver),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::owner::Owner;
    use chrono::Utc;

    fn dir(id: u128, parent: Option<u128>, name: &str) -> Directory {
        let now = Utc::now();
        Directory {
            id: Uuid::from_u128(id),
            owner_id: Uuid::nil(),
            parent_id: parent.map(Uuid::from_u128),
            name: name.to_string(),
            virtual_name: name.to_string(),
            path: String::new(),
            virtual_path: String::new(),
            created_at: now,
            last_modified: now,
        }
    }

    fn file(id: u128, parent: Option<u128>, name: &str) -> CloudFile {
        let now = Utc::now();
        CloudFile {
            id: Uuid::from_u128(id),
            owner_id: Uuid::nil(),
            parent_id: parent.map(Uuid::from_u128),
            name: name.to_string(),
            virtual_name: name.to_string(),
            path: String::new(),
            virtual_path: String::new(),
            size_bytes: 0,
            checksum: None,
            uploaded: false,
            content_type: None,
            created_at: now,
            last_modified: now,
        }
    }

    /// docs/ (1) -> reports/ (2) -> q1.pdf (10); docs/a.txt (11); music/ (3)
    fn sample() -> NamespaceTree {
        NamespaceTree::build(
            &[dir(1, None, "docs"), dir(2, Some(1), "reports"), dir(3, None, "music")],
            &[file(10, Some(2), "q1.pdf"), file(11, Some(1), "a.txt")],
        )
    }

    fn slot(tree: &NamespaceTree, id: u128) -> NodeId {
        tree.get(Uuid::from_u128(id)).unwrap()
    }

    #[test]
    fn test_build_links_parents() {
        let tree = sample();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.children(None).len(), 2);
        let q1 = slot(&tree, 10);
        let chain: Vec<Uuid> = tree.ancestors(q1).iter().map(|n| tree.node(*n).id).collect();
        assert_eq!(chain, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
    }

    #[test]
    fn test_resolve_from_arena() {
        let tree = sample();
        let owner = Owner::for_user(Uuid::nil(), "alice", "cloud/user");
        let resolver = PathResolver::new(&owner);
        let paths = tree.resolve(slot(&tree, 10), &resolver);
        assert_eq!(paths.virtual_path, "alice/docs/reports/q1.pdf");
        assert_eq!(paths.path, "cloud/user/alice/docs/reports/q1.pdf");
    }

    #[test]
    fn test_descendants_preorder() {
        let tree = sample();
        let ids: Vec<Uuid> = tree
            .descendants(slot(&tree, 1))
            .iter()
            .map(|n| tree.node(*n).id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&Uuid::from_u128(10)));
        assert!(!ids.contains(&Uuid::from_u128(3)));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut tree = sample();
        let docs = slot(&tree, 1);
        let reports = slot(&tree, 2);
        let err = tree.reparent(docs, Some(reports)).unwrap_err();
        assert_eq!(err.code, codes::INVALID_MOVE);
        let err = tree.reparent(docs, Some(docs)).unwrap_err();
        assert_eq!(err.code, codes::INVALID_MOVE);
        let err = tree.reparent(docs, Some(slot(&tree, 11))).unwrap_err();
        assert_eq!(err.code, codes::INVALID_MOVE);
        // Unchanged after the failed attempts.
        assert!(tree.node(docs).parent.is_none());
    }

    #[test]
    fn test_reparent_and_rename_update_paths() {
        let mut tree = sample();
        let owner = Owner::for_user(Uuid::nil(), "alice", "cloud/user");
        let resolver = PathResolver::new(&owner);
        let reports = slot(&tree, 2);
        tree.reparent(reports, Some(slot(&tree, 3))).unwrap();
        tree.rename(reports, "Reports 2024");
        let paths = tree.resolve(slot(&tree, 10), &resolver);
        assert_eq!(paths.virtual_path, "alice/music/Reports 2024/q1.pdf");
        assert_eq!(paths.path, "cloud/user/alice/music/reports/q1.pdf");
        assert_eq!(tree.children(Some(slot(&tree, 1))).len(), 1);
    }

    #[test]
    fn test_entries_sort_directories_first() {
        let tree = sample();
        let owner = Owner::for_user(Uuid::nil(), "alice", "cloud/user");
        let entries = tree.entries(&PathResolver::new(&owner));
        assert_eq!(entries[0].name, "docs");
        let docs_children: Vec<&str> = entries[0].children.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(docs_children, vec!["reports", "a.txt"]);
        assert_eq!(entries[0].children[0].children[0].virtual_path, "alice/docs/reports/q1.pdf");
    }
}
