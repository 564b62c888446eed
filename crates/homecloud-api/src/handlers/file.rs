//! File record handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use homecloud_entity::cloud::CloudFile;

use crate::dto::request::{RegisterFileRequest, UpdateNodeRequest};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::dto::validated;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/files: register a file before uploading its content.
pub async fn register_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RegisterFileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CloudFile>>), ApiError> {
    let req = validated(req)?;
    let file = state.files.register(&auth, req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(file))))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<CloudFile> {
    ok(state.files.get(&auth, id).await?)
}

/// PATCH /api/files/{id}: rename and/or move.
pub async fn update_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNodeRequest>,
) -> ApiResult<CloudFile> {
    let req = validated(req)?;
    ok(state.files.update(&auth, id, req.into()).await?)
}

/// DELETE /api/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<MessageResponse> {
    state.files.delete(&auth, id).await?;
    ok(MessageResponse::new("File deleted", "file-deleted"))
}

/// DELETE /api/files/{id}/content: drop the content, keep the record.
pub async fn delete_content(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<CloudFile> {
    ok(state.files.delete_content(&auth, id).await?)
}
