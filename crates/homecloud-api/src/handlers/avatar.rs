//! Avatar upload, crop, delete, and rendition serving.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use bytes::Bytes;

use homecloud_core::error::AppError;
use homecloud_service::account::AvatarSize;

use crate::dto::request::CropAvatarRequest;
use crate::dto::response::ProfileResponse;
use crate::dto::validated;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/account/avatar: multipart field `avatar` (or `file`).
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<ProfileResponse> {
    let mut data: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        if matches!(field.name(), Some("avatar") | Some("file")) {
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
            );
        }
    }
    let data = data.ok_or_else(|| AppError::validation("avatar is required"))?;

    let user = state.avatars.upload(&auth, data).await?;
    ok(ProfileResponse::from_user(&user, &state.avatars))
}

/// POST /api/account/avatar/crop
pub async fn crop_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CropAvatarRequest>,
) -> ApiResult<ProfileResponse> {
    let req = validated(req)?;
    let user = state.avatars.crop(&auth, req.into()).await?;
    ok(ProfileResponse::from_user(&user, &state.avatars))
}

/// DELETE /api/account/avatar
pub async fn delete_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<ProfileResponse> {
    let user = state.avatars.delete(&auth).await?;
    ok(ProfileResponse::from_user(&user, &state.avatars))
}

/// GET /api/users/{username}/avatar/{size}
///
/// Users without an avatar are redirected to the default image.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path((username, size)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let size: AvatarSize = size.parse()?;
    let Some(data) = state.avatars.read(&username, size).await? else {
        return Ok(Redirect::temporary(&state.avatars.default_url()).into_response());
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
    Ok(response)
}
