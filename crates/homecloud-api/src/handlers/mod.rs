//! Route handlers organized by domain.

use axum::Json;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;

pub mod account;
pub mod auth;
pub mod avatar;
pub mod cloud;
pub mod directory;
pub mod file;
pub mod health;
pub mod transfer;
pub mod user;

/// JSON success envelope or an error response.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub(crate) fn ok<T: serde::Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}
