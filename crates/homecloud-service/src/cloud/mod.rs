//! The per-user cloud namespace: directories, files, and content transfer.

pub mod directory;
pub mod file;
pub mod namespace;
pub mod transfer;

pub use directory::{DirectoryService, Listing, LookupResult};
pub use file::{FileService, RegisterFile};
pub use namespace::{Namespace, NodeChange, Placement};
pub use transfer::{TransferService, TransferTicket};
