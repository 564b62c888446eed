//! Upload/download authorization and local content transfer.

use std::io;

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use futures::{StreamExt, stream};
use serde::Serialize;
use uuid::Uuid;

use homecloud_core::error::AppError;
use homecloud_core::traits::storage::ByteStream;
use homecloud_entity::cloud::CloudFile;
use homecloud_service::cloud::TransferTicket;

use crate::dto::request::{ChecksumQuery, CompleteUploadRequest};
use crate::dto::validated;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// Header carrying the hex SHA-256 of a raw-body upload.
pub const CHECKSUM_HEADER: &str = "x-checksum";

/// Outcome of a local upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub code: String,
    pub file: CloudFile,
}

impl UploadResponse {
    fn new(file: CloudFile) -> Self {
        Self {
            message: "File uploaded".to_string(),
            code: "file-uploaded".to_string(),
            file,
        }
    }
}

/// POST /api/files/{id}/upload-request
pub async fn upload_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<TransferTicket> {
    ok(state.transfers.upload_request(&auth, id).await?)
}

/// POST /api/files/{id}/download-request
pub async fn download_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<TransferTicket> {
    ok(state.transfers.download_request(&auth, id).await?)
}

/// POST /api/files/{id}/upload-complete: commit a presigned upload.
pub async fn upload_complete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteUploadRequest>,
) -> ApiResult<UploadResponse> {
    let req = validated(req)?;
    let file = state
        .transfers
        .complete_upload(&auth, id, req.upload_id, &req.checksum)
        .await?;
    ok(UploadResponse::new(file))
}

/// PUT /api/files/{id}/content: the request body is the content.
///
/// The checksum comes from the `x-checksum` header or `?checksum=`.
pub async fn upload_raw(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ChecksumQuery>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<UploadResponse> {
    let checksum = headers
        .get(CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query.checksum)
        .ok_or_else(|| AppError::validation("checksum is required"))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let stream: ByteStream = Box::pin(
        body.into_data_stream()
            .map(|chunk| chunk.map_err(io::Error::other)),
    );
    let file = state
        .transfers
        .upload(&auth, id, stream, &checksum, content_type)
        .await?;
    ok(UploadResponse::new(file))
}

/// POST /api/files/{id}/content: multipart fields `file` and `checksum`.
pub async fn upload_multipart(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut checksum: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        match field.name().unwrap_or("") {
            "checksum" => {
                checksum = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
                );
            }
            "file" => {
                content_type = field.content_type().map(String::from);
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let checksum = checksum.ok_or_else(|| AppError::validation("checksum is required"))?;
    let data = data.ok_or_else(|| AppError::validation("file is required"))?;

    let stream: ByteStream = Box::pin(stream::once(async move { Ok(data) }));
    let file = state
        .transfers
        .upload(&auth, id, stream, checksum.trim(), content_type)
        .await?;
    ok(UploadResponse::new(file))
}

/// GET /api/files/{id}/content: stream the stored bytes.
pub async fn download(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (file, stream) = state.transfers.download(&auth, id).await?;

    let content_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, file.content_disposition())
        .header(header::CONTENT_LENGTH, file.size_bytes)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
    Ok(response)
}
