//! Directory CRUD handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use homecloud_entity::cloud::Directory;
use homecloud_service::cloud::Listing;

use crate::dto::request::{CreateDirectoryRequest, UpdateNodeRequest};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::dto::validated;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// GET /api/directories: the owner root listing.
pub async fn list_root(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Listing> {
    ok(state.directories.root(&auth).await?)
}

/// POST /api/directories
pub async fn create_directory(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateDirectoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Directory>>), ApiError> {
    let req = validated(req)?;
    let dir = state
        .directories
        .create(&auth, req.parent_id, &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(dir))))
}

/// GET /api/directories/{id}
pub async fn get_directory(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Directory> {
    ok(state.directories.get(&auth, id).await?)
}

/// GET /api/directories/{id}/children
pub async fn list_children(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Listing> {
    ok(state.directories.children(&auth, id).await?)
}

/// PATCH /api/directories/{id}: rename and/or move.
pub async fn update_directory(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNodeRequest>,
) -> ApiResult<Directory> {
    let req = validated(req)?;
    ok(state.directories.update(&auth, id, req.into()).await?)
}

/// DELETE /api/directories/{id}
pub async fn delete_directory(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<MessageResponse> {
    state.directories.delete(&auth, id).await?;
    ok(MessageResponse::new("Directory deleted", "directory-deleted"))
}
