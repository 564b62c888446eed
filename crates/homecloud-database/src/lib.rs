//! # homecloud-database
//!
//! Persistence for HomeCloud. The services talk to the store traits in
//! [`store`]; [`repositories`] implements them on PostgreSQL and
//! [`memory`] implements them in process for tests and single-node demos.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{CloudStore, Database, NodeUpdate, TokenStore, UserStore};
