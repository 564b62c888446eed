//! # homecloud-storage
//!
//! Object storage for HomeCloud: a local filesystem provider, an
//! S3-compatible provider (feature `s3`), the [`StorageManager`] that
//! fronts whichever one is configured, SHA-256 checksum helpers, and the
//! avatar image pipeline.

pub mod checksum;
pub mod imaging;
pub mod manager;
pub mod providers;

pub use manager::StorageManager;
