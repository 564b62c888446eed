//! Storage manager: fronts the configured provider for the rest of the app.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use homecloud_core::config::storage::StorageConfig;
use homecloud_core::error::AppError;
use homecloud_core::result::AppResult;
use homecloud_core::traits::storage::{
    ByteStream, PresignedRequest, StorageObjectMeta, StorageProvider,
};

use crate::checksum::hex_to_base64;
use crate::providers::LocalStorageProvider;

/// Shared handle to the active storage backend.
#[derive(Debug, Clone)]
pub struct StorageManager {
    provider: Arc<dyn StorageProvider>,
    presign_expiry_seconds: u64,
}

impl StorageManager {
    /// Initialize the provider named by `config.provider`.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let provider: Arc<dyn StorageProvider> = match config.provider.as_str() {
            "local" => {
                info!(root = %config.local.root_path, "Initializing local storage provider");
                Arc::new(LocalStorageProvider::new(&config.local.root_path).await?)
            }
            #[cfg(feature = "s3")]
            "s3" => Arc::new(
                crate::providers::S3StorageProvider::new(
                    &config.s3,
                    config.multipart_part_size_bytes,
                )
                .await?,
            ),
            #[cfg(not(feature = "s3"))]
            "s3" => {
                return Err(AppError::configuration(
                    "S3 storage requires building with the `s3` feature",
                ));
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider: '{other}'. Supported: local, s3"
                )));
            }
        };
        Ok(Self::from_provider(provider, config.presign_expiry_seconds))
    }

    /// Wrap an already constructed provider.
    pub fn from_provider(provider: Arc<dyn StorageProvider>, presign_expiry_seconds: u64) -> Self {
        Self {
            provider,
            presign_expiry_seconds,
        }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    pub fn provider_type(&self) -> &str {
        self.provider.provider_type()
    }

    /// Whether clients can talk to the backend directly through signed URLs.
    pub fn supports_presigning(&self) -> bool {
        self.provider.provider_type() != "local"
    }

    pub async fn health_check(&self) -> AppResult<bool> {
        self.provider.health_check().await
    }

    pub async fn read(&self, path: &str) -> AppResult<ByteStream> {
        self.provider.read(path).await
    }

    pub async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.provider.read_bytes(path).await
    }

    pub async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        self.provider.write(path, data).await
    }

    pub async fn write_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64> {
        self.provider.write_stream(path, stream).await
    }

    pub async fn delete(&self, path: &str) -> AppResult<()> {
        self.provider.delete(path).await
    }

    pub async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
        self.provider.delete_prefix(prefix).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        self.provider.rename(from, to).await
    }

    pub async fn exists(&self, path: &str) -> AppResult<bool> {
        self.provider.exists(path).await
    }

    pub async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        self.provider.metadata(path).await
    }

    /// Signed upload URL, or `None` when the backend has no direct access.
    ///
    /// `checksum` is a hex SHA-256 the uploaded body must hash to.
    pub async fn presign_put(
        &self,
        path: &str,
        checksum: Option<&str>,
    ) -> AppResult<Option<PresignedRequest>> {
        let checksum = checksum.map(hex_to_base64).transpose()?;
        self.provider
            .presign_put(path, self.presign_expiry_seconds, checksum.as_deref())
            .await
    }

    /// Signed download URL, or `None` when the backend has no direct access.
    pub async fn presign_get(
        &self,
        path: &str,
        content_disposition: &str,
    ) -> AppResult<Option<PresignedRequest>> {
        self.provider
            .presign_get(path, self.presign_expiry_seconds, content_disposition)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homecloud_core::config::storage::LocalStorageConfig;

    #[tokio::test]
    async fn test_from_config_local() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            local: LocalStorageConfig {
                root_path: dir.path().to_string_lossy().into_owned(),
            },
            ..StorageConfig::default()
        };
        let storage = StorageManager::from_config(&config).await.unwrap();
        assert_eq!(storage.provider_type(), "local");
        assert!(!storage.supports_presigning());
        assert!(storage.health_check().await.unwrap());
        assert!(storage.presign_put("a.txt", None).await.unwrap().is_none());
        assert!(storage.presign_put("a.txt", Some("abc")).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_rejected() {
        let config = StorageConfig {
            provider: "ftp".to_string(),
            ..StorageConfig::default()
        };
        let err = StorageManager::from_config(&config).await.unwrap_err();
        assert_eq!(err.kind, homecloud_core::ErrorKind::Configuration);
    }
}
