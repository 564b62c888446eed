//! Path resolution for namespace nodes.
//!
//! A node's physical path is the owner's root prefix followed by the
//! stored names of its ancestors and itself. Its virtual path is the
//! username followed by the display names. Directory paths end with `/`,
//! file paths do not.

use serde::{Deserialize, Serialize};

use super::owner::Owner;

/// Kind of namespace node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

/// One step of an ancestry chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Stored name.
    pub name: &'a str,
    /// Display name.
    pub virtual_name: &'a str,
}

impl<'a> Segment<'a> {
    pub fn new(name: &'a str, virtual_name: &'a str) -> Self {
        Self { name, virtual_name }
    }
}

/// Both derived paths of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPaths {
    pub path: String,
    pub virtual_path: String,
}

/// Computes derived paths relative to one owner.
#[derive(Debug, Clone)]
pub struct PathResolver<'o> {
    owner: &'o Owner,
}

impl<'o> PathResolver<'o> {
    pub fn new(owner: &'o Owner) -> Self {
        Self { owner }
    }

    /// Resolve a node from its full ancestry, outermost directory first.
    pub fn resolve(&self, ancestors: &[Segment<'_>], node: Segment<'_>, kind: NodeKind) -> ResolvedPaths {
        let mut path = self.owner.root_path.clone();
        let mut virtual_path = self.owner.virtual_root();
        for segment in ancestors {
            push_dir(&mut path, segment.name);
            push_dir(&mut virtual_path, segment.virtual_name);
        }
        finish(&mut path, node.name, kind);
        finish(&mut virtual_path, node.virtual_name, kind);
        ResolvedPaths { path, virtual_path }
    }

    /// Resolve a node whose parent's paths are already known.
    ///
    /// `parent` is `None` for nodes directly under the owner root. The
    /// result equals [`PathResolver::resolve`] over the full ancestry as
    /// long as the parent's stored paths are current.
    pub fn resolve_under(
        &self,
        parent: Option<(&str, &str)>,
        node: Segment<'_>,
        kind: NodeKind,
    ) -> ResolvedPaths {
        let (mut path, mut virtual_path) = match parent {
            Some((path, virtual_path)) => (path.to_string(), virtual_path.to_string()),
            None => (self.owner.root_path.clone(), self.owner.virtual_root()),
        };
        finish(&mut path, node.name, kind);
        finish(&mut virtual_path, node.virtual_name, kind);
        ResolvedPaths { path, virtual_path }
    }
}

fn push_dir(buf: &mut String, name: &str) {
    buf.push_str(name);
    buf.push('/');
}

fn finish(buf: &mut String, name: &str, kind: NodeKind) {
    match kind {
        NodeKind::Directory => push_dir(buf, name),
        NodeKind::File => buf.push_str(name),
    }
}

/// Strip the directory marker so files and directories compare equal.
pub fn normalize(virtual_path: &str) -> &str {
    virtual_path.trim_end_matches('/')
}
