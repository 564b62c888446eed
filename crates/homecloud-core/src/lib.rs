//! # homecloud-core
//!
//! Core crate for HomeCloud. Contains configuration schemas, the storage
//! provider trait, pagination types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other HomeCloud crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
