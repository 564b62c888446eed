//! Upload and download authorization, and checksum-verified content
//! transfer.

use std::io;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use homecloud_core::error::{AppError, ErrorKind, codes};
use homecloud_core::result::AppResult;
use homecloud_core::traits::storage::{ByteStream, PresignedRequest};
use homecloud_entity::cloud::CloudFile;
use homecloud_storage::checksum::{ChecksumWriter, parse_checksum};
use homecloud_storage::providers::mime_from_path;

use super::namespace::Namespace;
use crate::context::RequestContext;

/// How the client should move the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTicket {
    pub file_id: Uuid,
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    /// Whether the URL goes straight to the storage backend.
    pub presigned: bool,
    /// Lifetime of a presigned URL in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Presigned uploads only: passed back to commit the upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct TransferService {
    ns: Namespace,
    public_url: String,
    max_upload_size: u64,
    presign_expiry_seconds: u64,
}

fn checksum_mismatch(expected: &str, actual: &str) -> AppError {
    AppError::validation(format!(
        "Checksum mismatch: expected {expected}, received content hashes to {actual}"
    ))
    .with_code(codes::CHECKSUM_MISMATCH)
}

impl TransferService {
    pub fn new(
        ns: Namespace,
        public_url: &str,
        max_upload_size: u64,
        presign_expiry_seconds: u64,
    ) -> Self {
        Self {
            ns,
            public_url: public_url.trim_end_matches('/').to_string(),
            max_upload_size,
            presign_expiry_seconds,
        }
    }

    fn content_url(&self, id: Uuid) -> String {
        format!("{}/api/files/{id}/content", self.public_url)
    }

    fn ticket(&self, file_id: Uuid, presigned: Option<PresignedRequest>, method: &str) -> TransferTicket {
        match presigned {
            Some(req) => TransferTicket {
                file_id,
                method: req.method,
                url: req.url,
                headers: req.headers,
                presigned: true,
                expires_in: Some(self.presign_expiry_seconds),
                upload_id: None,
            },
            None => TransferTicket {
                file_id,
                method: method.to_string(),
                url: self.content_url(file_id),
                headers: Vec::new(),
                presigned: false,
                expires_in: None,
                upload_id: None,
            },
        }
    }

    /// Key a presigned upload is written to until it is committed.
    pub fn pending_key(file: &CloudFile, upload_id: Uuid) -> String {
        format!("{}.pending-{}", file.path, upload_id.simple())
    }

    /// Authorize an upload to `id`.
    ///
    /// Presigned URLs point at a pending key, never at the committed
    /// object, and carry the declared checksum while one still applies.
    pub async fn upload_request(&self, ctx: &RequestContext, id: Uuid) -> AppResult<TransferTicket> {
        let file = self.ns.writable_file(ctx, id).await?;
        let upload_id = Uuid::new_v4();
        let declared = file.checksum.as_deref().filter(|_| !file.uploaded);
        let presigned = self
            .ns
            .storage
            .presign_put(&Self::pending_key(&file, upload_id), declared)
            .await?;
        debug!(file_id = %file.id, presigned = presigned.is_some(), "Upload authorized");
        let mut ticket = self.ticket(file.id, presigned, "POST");
        if ticket.presigned {
            ticket.upload_id = Some(upload_id);
        }
        Ok(ticket)
    }

    /// Authorize a download of `id`.
    pub async fn download_request(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> AppResult<TransferTicket> {
        let file = self.uploaded_file(ctx, id).await?;
        let presigned = self
            .ns
            .storage
            .presign_get(&file.path, &file.content_disposition())
            .await?;
        debug!(file_id = %file.id, presigned = presigned.is_some(), "Download authorized");
        Ok(self.ticket(file.id, presigned, "GET"))
    }

    async fn uploaded_file(&self, ctx: &RequestContext, id: Uuid) -> AppResult<CloudFile> {
        let file = self.ns.readable_file(ctx, id).await?;
        if !file.uploaded {
            return Err(AppError::not_found("This file has no uploaded content")
                .with_code(codes::FILE_NOT_UPLOADED));
        }
        Ok(file)
    }

    /// Check a computed digest against the client value and, before the
    /// first upload, against the checksum declared at registration.
    fn verify(file: &CloudFile, client: &str, actual: &str) -> AppResult<()> {
        if client != actual {
            return Err(checksum_mismatch(client, actual));
        }
        if let Some(declared) = file.checksum.as_deref().filter(|_| !file.uploaded) {
            if declared != actual {
                return Err(checksum_mismatch(declared, actual));
            }
        }
        Ok(())
    }

    /// Receive content for `id`, verify it, and commit it.
    ///
    /// Bytes land on a staging key first; the stored content and the
    /// record stay untouched unless the checksum matches.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        stream: ByteStream,
        client_checksum: &str,
        content_type: Option<String>,
    ) -> AppResult<CloudFile> {
        let file = self.ns.writable_file(ctx, id).await?;
        let client_checksum = parse_checksum(client_checksum)?;

        let digest = Arc::new(Mutex::new(ChecksumWriter::new()));
        let tap = digest.clone();
        let limit = self.max_upload_size;
        let tapped: ByteStream = Box::pin(stream.map(move |chunk| {
            let chunk = chunk?;
            let mut writer = tap
                .lock()
                .map_err(|_| io::Error::other("checksum state poisoned"))?;
            writer.update(&chunk);
            if writer.len() > limit {
                return Err(io::Error::other(format!("upload exceeds {limit} bytes")));
            }
            Ok(chunk)
        }));

        let staging = format!("{}.uploading-{}", file.path, Uuid::new_v4().simple());
        let write_result = self.ns.storage.write_stream(&staging, tapped).await;
        let writer = digest
            .lock()
            .map(|mut w| std::mem::take(&mut *w))
            .map_err(|_| AppError::internal("Checksum state poisoned"))?;

        let size = match write_result {
            Ok(size) => size,
            Err(e) => {
                self.discard(&staging).await;
                if writer.len() > limit {
                    return Err(AppError::validation(format!(
                        "Upload exceeds the {limit} byte limit"
                    ))
                    .with_code(codes::UPLOAD_TOO_LARGE));
                }
                return Err(e);
            }
        };

        let actual = writer.finish();
        if let Err(e) = Self::verify(&file, &client_checksum, &actual) {
            self.discard(&staging).await;
            warn!(file_id = %file.id, "Rejected upload with mismatching checksum");
            return Err(e);
        }

        if let Err(e) = self.ns.storage.rename(&staging, &file.path).await {
            self.discard(&staging).await;
            return Err(e);
        }

        let content_type = content_type
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| mime_from_path(&file.virtual_name));
        let file = self
            .ns
            .db
            .cloud
            .set_file_content(file.id, size as i64, &actual, content_type.as_deref())
            .await?;
        info!(file_id = %file.id, size, "File content uploaded");
        Ok(file)
    }

    /// Commit content a client wrote directly through a presigned URL.
    ///
    /// The pending object is hashed and checked like a local upload, then
    /// moved onto the file's key. On any failure it is discarded and the
    /// committed content is left as it was.
    pub async fn complete_upload(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        upload_id: Uuid,
        client_checksum: &str,
    ) -> AppResult<CloudFile> {
        let file = self.ns.writable_file(ctx, id).await?;
        let client_checksum = parse_checksum(client_checksum)?;
        let pending = Self::pending_key(&file, upload_id);

        let mut stream = self.ns.storage.read(&pending).await.map_err(|e| match e.kind {
            ErrorKind::NotFound => AppError::not_found("No content has been uploaded yet")
                .with_code(codes::FILE_NOT_UPLOADED),
            _ => e,
        })?;
        let mut writer = ChecksumWriter::new();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.discard(&pending).await;
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        "Failed to read uploaded object",
                        e,
                    ));
                }
            };
            writer.update(&chunk);
        }
        let size = writer.len();
        if size > self.max_upload_size {
            self.discard(&pending).await;
            return Err(AppError::validation(format!(
                "Upload exceeds the {} byte limit",
                self.max_upload_size
            ))
            .with_code(codes::UPLOAD_TOO_LARGE));
        }

        let actual = writer.finish();
        if let Err(e) = Self::verify(&file, &client_checksum, &actual) {
            self.discard(&pending).await;
            warn!(file_id = %file.id, "Rejected presigned upload with mismatching checksum");
            return Err(e);
        }

        let content_type = self
            .ns
            .storage
            .metadata(&pending)
            .await
            .ok()
            .and_then(|m| m.mime_type)
            .filter(|ct| !ct.ends_with("octet-stream"))
            .or_else(|| mime_from_path(&file.virtual_name));
        if let Err(e) = self.ns.storage.rename(&pending, &file.path).await {
            self.discard(&pending).await;
            return Err(e);
        }

        let file = self
            .ns
            .db
            .cloud
            .set_file_content(file.id, size as i64, &actual, content_type.as_deref())
            .await?;
        info!(file_id = %file.id, size, "Presigned upload committed");
        Ok(file)
    }

    /// Stream the stored content of `id`.
    pub async fn download(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> AppResult<(CloudFile, ByteStream)> {
        let file = self.uploaded_file(ctx, id).await?;
        let stream = self.ns.storage.read(&file.path).await?;
        Ok((file, stream))
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.ns.storage.delete(key).await {
            warn!(key, error = %e, "Failed to discard object");
        }
    }
}
