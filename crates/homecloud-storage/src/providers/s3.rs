//! S3-compatible object storage provider (requires the `s3` feature).

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use homecloud_core::config::storage::S3StorageConfig;
use homecloud_core::error::AppError;
use homecloud_core::result::AppResult;
use homecloud_core::traits::storage::{
    ByteStream, PresignedRequest, StorageObjectMeta, StorageProvider,
};

use super::mime_from_path;

/// S3 caps a single `DeleteObjects` request at 1000 keys.
const DELETE_BATCH: usize = 1000;

/// Smallest part size S3 accepts for all but the last part.
const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3-compatible storage provider.
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    client: Client,
    bucket: String,
    part_size: usize,
}

fn s3_error(action: &str, key: &str, err: impl std::error::Error) -> AppError {
    AppError::storage(format!(
        "S3 {action} failed for '{key}': {}",
        DisplayErrorContext(err)
    ))
}

impl S3StorageProvider {
    /// Build a client from configuration.
    ///
    /// Empty credentials fall back to the default AWS credential chain; a
    /// non-empty endpoint targets an S3-compatible service such as MinIO.
    pub async fn new(config: &S3StorageConfig, part_size: usize) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("storage.s3.bucket must be set"));
        }
        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 storage provider"
        );

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "homecloud-config",
            ));
        }
        if !config.endpoint.is_empty() {
            loader = loader.endpoint_url(config.endpoint.clone());
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            part_size: part_size.max(MIN_PART_SIZE),
        })
    }

    fn key(path: &str) -> &str {
        path.trim_start_matches('/')
    }

    fn presigning(expires_in_seconds: u64) -> AppResult<PresigningConfig> {
        PresigningConfig::expires_in(Duration::from_secs(expires_in_seconds))
            .map_err(|e| AppError::configuration(format!("Invalid presign expiry: {e}")))
    }

    async fn put_single(&self, key: &str, data: Bytes) -> AppResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(S3ByteStream::from(data));
        if let Some(mime) = mime_from_path(key) {
            request = request.content_type(mime);
        }
        request.send().await.map_err(|e| s3_error("put", key, e))?;
        Ok(())
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        mut buffer: BytesMut,
        mut stream: ByteStream,
    ) -> AppResult<(Vec<CompletedPart>, u64)> {
        let mut parts = Vec::new();
        let mut total = buffer.len() as u64;
        let mut finished = false;

        while !finished {
            while buffer.len() < self.part_size {
                match stream.next().await {
                    Some(chunk) => {
                        let chunk = chunk.map_err(|e| {
                            AppError::storage(format!("Stream read error for '{key}': {e}"))
                        })?;
                        total += chunk.len() as u64;
                        buffer.extend_from_slice(&chunk);
                    }
                    None => {
                        finished = true;
                        break;
                    }
                }
            }
            if buffer.is_empty() {
                break;
            }

            let take = buffer.len().min(self.part_size);
            let body = buffer.split_to(take).freeze();
            let part_number = parts.len() as i32 + 1;
            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(S3ByteStream::from(body))
                .send()
                .await
                .map_err(|e| s3_error("upload part", key, e))?;
            parts.push(
                CompletedPart::builder()
                    .set_e_tag(output.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }
        Ok((parts, total))
    }

    async fn delete_batch(&self, prefix: &str, keys: Vec<String>) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let objects = keys
            .into_iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|e| AppError::internal(format!("Invalid object identifier: {e}")))
            })
            .collect::<AppResult<Vec<_>>>()?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| AppError::internal(format!("Invalid delete request: {e}")))?;
        self.client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| s3_error("delete prefix", prefix, e))?;
        Ok(())
    }
}

/// Percent-encode a key for the `x-amz-copy-source` header, keeping `/`.
fn encode_copy_source(bucket: &str, key: &str) -> String {
    let mut out = String::with_capacity(bucket.len() + key.len() + 1);
    out.push_str(bucket);
    out.push('/');
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(bucket = %self.bucket, error = %DisplayErrorContext(&e), "S3 health check failed");
                Ok(false)
            }
        }
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let key = Self::key(path);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    s3_error("get", key, e)
                }
            })?;
        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let key = Self::key(path);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    s3_error("get", key, e)
                }
            })?;
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| s3_error("read body", key, e))?;
        Ok(data.into_bytes())
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        let key = Self::key(path);
        let len = data.len();
        self.put_single(key, data).await?;
        debug!(key, bytes = len, "Wrote S3 object");
        Ok(())
    }

    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> AppResult<u64> {
        let key = Self::key(path);

        // Small bodies go up in one request; only start a multipart upload
        // once a full part has been buffered.
        let mut buffer = BytesMut::new();
        while buffer.len() < self.part_size {
            match stream.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| {
                        AppError::storage(format!("Stream read error for '{key}': {e}"))
                    })?;
                    buffer.extend_from_slice(&chunk);
                }
                None => {
                    let len = buffer.len() as u64;
                    self.put_single(key, buffer.freeze()).await?;
                    return Ok(len);
                }
            }
        }

        let mut create = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key);
        if let Some(mime) = mime_from_path(key) {
            create = create.content_type(mime);
        }
        let created = create
            .send()
            .await
            .map_err(|e| s3_error("start multipart upload", key, e))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| AppError::storage(format!("S3 returned no upload id for '{key}'")))?
            .to_string();

        match self.upload_parts(key, &upload_id, buffer, stream).await {
            Ok((parts, total)) => {
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(completed)
                    .send()
                    .await
                    .map_err(|e| s3_error("complete multipart upload", key, e))?;
                debug!(key, bytes = total, "Wrote S3 object from stream");
                Ok(total)
            }
            Err(err) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key, error = %DisplayErrorContext(&abort), "Failed to abort multipart upload");
                }
                Err(err)
            }
        }
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let key = Self::key(path);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| s3_error("delete", key, e))?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
        let prefix = Self::key(prefix);
        if prefix.is_empty() {
            return Err(AppError::validation("Refusing to delete the whole bucket"));
        }

        let mut continuation: Option<String> = None;
        let mut pending = Vec::new();
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| s3_error("list", prefix, e))?;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    pending.push(key.to_string());
                    if pending.len() == DELETE_BATCH {
                        self.delete_batch(prefix, std::mem::take(&mut pending)).await?;
                    }
                }
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }
        self.delete_batch(prefix, pending).await
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let from_key = Self::key(from);
        let to_key = Self::key(to);
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(encode_copy_source(&self.bucket, from_key))
            .key(to_key)
            .send()
            .await
            .map_err(|e| s3_error("copy", from_key, e))?;
        self.delete(from_key).await?;
        debug!(from = from_key, to = to_key, "Moved S3 object");
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let key = Self::key(path);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(s3_error("head", key, e)),
        }
    }

    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        let key = Self::key(path);
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    s3_error("head", key, e)
                }
            })?;

        Ok(StorageObjectMeta {
            path: path.to_string(),
            size_bytes: output.content_length().unwrap_or(0).max(0) as u64,
            mime_type: output
                .content_type()
                .map(str::to_string)
                .or_else(|| mime_from_path(key)),
            last_modified: output
                .last_modified()
                .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
        })
    }

    async fn presign_put(
        &self,
        path: &str,
        expires_in_seconds: u64,
        checksum_sha256: Option<&str>,
    ) -> AppResult<Option<PresignedRequest>> {
        let key = Self::key(path);
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_checksum_sha256(checksum_sha256.map(str::to_string))
            .presigned(Self::presigning(expires_in_seconds)?)
            .await
            .map_err(|e| s3_error("presign put", key, e))?;
        Ok(Some(PresignedRequest {
            method: presigned.method().to_string(),
            url: presigned.uri().to_string(),
            headers: presigned
                .headers()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }))
    }

    async fn presign_get(
        &self,
        path: &str,
        expires_in_seconds: u64,
        content_disposition: &str,
    ) -> AppResult<Option<PresignedRequest>> {
        let key = Self::key(path);
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(content_disposition)
            .presigned(Self::presigning(expires_in_seconds)?)
            .await
            .map_err(|e| s3_error("presign get", key, e))?;
        Ok(Some(PresignedRequest {
            method: presigned.method().to_string(),
            url: presigned.uri().to_string(),
            headers: presigned
                .headers()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_source_is_percent_encoded() {
        assert_eq!(
            encode_copy_source("bucket", "cloud/user/alice/my file#1.txt"),
            "bucket/cloud/user/alice/my%20file%231.txt"
        );
        assert_eq!(encode_copy_source("b", "a/ü"), "b/a/%C3%BC");
    }
}
