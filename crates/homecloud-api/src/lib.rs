//! # homecloud-api
//!
//! HTTP API layer for HomeCloud built on Axum.
//!
//! Provides the REST endpoints for accounts, avatars, and the cloud
//! namespace, the bearer-token extractor, middleware (CORS, request
//! logging), DTOs, and the mapping from domain errors to responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
