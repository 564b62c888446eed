//! Storage provider trait for pluggable object storage backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Key within the storage provider.
    pub path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type (if known).
    pub mime_type: Option<String>,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// A pre-authorized HTTP request a client can perform directly against
/// the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PresignedRequest {
    /// HTTP method the URL was signed for.
    pub method: String,
    /// Fully qualified signed URL.
    pub url: String,
    /// Headers the client must send verbatim.
    pub headers: Vec<(String, String)>,
}

/// A byte stream type used for reading object contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for object storage backends.
///
/// Paths are `/`-separated keys relative to the backend root; a trailing
/// `/` denotes a prefix (directory). Implementations live in
/// `homecloud-storage`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read an object and return its byte stream.
    async fn read(&self, path: &str) -> AppResult<ByteStream>;

    /// Read an object into memory.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to the given key, replacing any existing object.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Write a byte stream to the given key. Returns the number of bytes written.
    async fn write_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Delete every object under a prefix.
    async fn delete_prefix(&self, prefix: &str) -> AppResult<()>;

    /// Move an object to a new key.
    async fn rename(&self, from: &str, to: &str) -> AppResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Get metadata about an object.
    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta>;

    /// Sign a direct upload. When `checksum_sha256` (base64) is given the
    /// backend must reject bodies with a different digest. Backends without
    /// direct access return `None`.
    async fn presign_put(
        &self,
        _path: &str,
        _expires_in_seconds: u64,
        _checksum_sha256: Option<&str>,
    ) -> AppResult<Option<PresignedRequest>> {
        Ok(None)
    }

    /// Sign a direct download with the given `Content-Disposition`.
    /// Backends without direct access return `None`.
    async fn presign_get(
        &self,
        _path: &str,
        _expires_in_seconds: u64,
        _content_disposition: &str,
    ) -> AppResult<Option<PresignedRequest>> {
        Ok(None)
    }
}
