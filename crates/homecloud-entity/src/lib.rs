//! # homecloud-entity
//!
//! Domain entity models for HomeCloud. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`.
//!
//! The [`cloud`] module also holds the pure namespace logic: name rules,
//! the path resolver, sibling uniqueness and the arena-backed tree.

pub mod cloud;
pub mod user;
