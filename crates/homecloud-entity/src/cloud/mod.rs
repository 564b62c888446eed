//! Cloud namespace entities.
//!
//! Each user owns one [`Owner`] namespace holding a tree of
//! [`Directory`] and [`CloudFile`] nodes. Every node carries two derived
//! paths: the physical `path` built from stored names under the owner's
//! root prefix, and the user-facing `virtual_path` built from display
//! names under the username.

pub mod directory;
pub mod file;
pub mod name;
pub mod owner;
pub mod path;
pub mod tree;
pub mod unique;

pub use directory::{CreateDirectory, Directory};
pub use file::{CloudFile, CreateFile};
pub use owner::Owner;
pub use path::{NodeKind, PathResolver, ResolvedPaths, Segment};
pub use tree::{NamespaceTree, NodeId, TreeEntry};
