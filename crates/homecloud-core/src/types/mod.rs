//! Core type definitions used across the HomeCloud workspace.

pub mod pagination;

pub use pagination::{PageRequest, PageResponse};
