//! Core trait definitions implemented by downstream crates.

pub mod storage;

pub use storage::{ByteStream, PresignedRequest, StorageObjectMeta, StorageProvider};
