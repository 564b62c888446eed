//! Shared setup for service integration tests: in-memory stores and a
//! temporary local storage root.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tempfile::TempDir;

use homecloud_core::config::AppConfig;
use homecloud_core::traits::storage::{
    ByteStream, PresignedRequest, StorageObjectMeta, StorageProvider,
};
use homecloud_core::{AppError, AppResult};
use homecloud_database::Database;
use homecloud_entity::user::User;
use homecloud_service::account::RegisterInput;
use homecloud_service::{MemoryMailer, RequestContext, Services};
use homecloud_storage::StorageManager;
use homecloud_storage::providers::LocalStorageProvider;

pub const PASSWORD: &str = "violet-harbor-lantern-42";

/// URL scheme of uploads signed by [`DirectStorage`].
pub const DIRECT_SCHEME: &str = "direct://";

/// Test environment
pub struct TestEnv {
    pub services: Services,
    pub db: Database,
    pub storage: StorageManager,
    pub mailer: Arc<MemoryMailer>,
    pub config: AppConfig,
    /// Set when the environment runs on [`DirectStorage`].
    pub direct: Option<Arc<DirectStorage>>,
    _root: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        Self::build(config, false).await
    }

    /// Environment whose storage signs direct uploads like an object store.
    pub async fn with_direct_storage() -> Self {
        Self::build(AppConfig::default(), true).await
    }

    async fn build(mut config: AppConfig, direct: bool) -> Self {
        let root = tempfile::tempdir().expect("Failed to create storage root");
        config.storage.local.root_path = root.path().to_string_lossy().into_owned();
        config.server.public_url = "http://cloud.test".to_string();

        let local = LocalStorageProvider::new(&config.storage.local.root_path)
            .await
            .expect("Failed to init local storage");
        let (provider, direct): (Arc<dyn StorageProvider>, _) = if direct {
            let direct = Arc::new(DirectStorage::new(local));
            (direct.clone(), Some(direct))
        } else {
            (Arc::new(local), None)
        };
        let storage =
            StorageManager::from_provider(provider, config.storage.presign_expiry_seconds);
        let db = Database::memory();
        let mailer = Arc::new(MemoryMailer::new());
        let services = Services::new(db.clone(), storage.clone(), mailer.clone(), &config);

        Self {
            services,
            db,
            storage,
            mailer,
            config,
            direct,
            _root: root,
        }
    }

    /// Perform a signed upload the way a client would.
    pub async fn put_signed(&self, url: &str, data: &'static [u8]) {
        let key = url
            .strip_prefix(DIRECT_SCHEME)
            .expect("Ticket was not signed by DirectStorage");
        self.storage
            .write(key, Bytes::from_static(data))
            .await
            .expect("Failed to write signed upload");
    }

    /// Register `username` with a strong password and return its context.
    pub async fn register(&self, username: &str) -> (User, RequestContext) {
        let (user, _token) = self
            .services
            .accounts
            .register(RegisterInput {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: PASSWORD.to_string(),
                language: None,
            })
            .await
            .expect("Failed to register user");
        let ctx = RequestContext::new(user.id, user.username.clone(), user.role);
        (user, ctx)
    }
}

/// One-chunk byte stream.
pub fn body(data: &'static [u8]) -> ByteStream {
    Box::pin(stream::iter(vec![Ok(Bytes::from_static(data))]))
}

/// Byte stream split into `parts` chunks.
pub fn chunked(data: &'static [u8], parts: usize) -> ByteStream {
    let size = data.len().div_ceil(parts.max(1)).max(1);
    let chunks: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(size)
        .map(|c| Ok(Bytes::from_static(c)))
        .collect();
    Box::pin(stream::iter(chunks))
}

/// Local storage that signs direct uploads and can be made to fail deletes.
#[derive(Debug)]
pub struct DirectStorage {
    inner: LocalStorageProvider,
    deletes_left: AtomicUsize,
}

impl DirectStorage {
    pub fn new(inner: LocalStorageProvider) -> Self {
        Self {
            inner,
            deletes_left: AtomicUsize::new(usize::MAX),
        }
    }

    /// Let `n` more deletes succeed, then fail every following one.
    pub fn fail_deletes_after(&self, n: usize) {
        self.deletes_left.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageProvider for DirectStorage {
    fn provider_type(&self) -> &str {
        "direct"
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        self.inner.read(path).await
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.inner.read_bytes(path).await
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        self.inner.write(path, data).await
    }

    async fn write_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64> {
        self.inner.write_stream(path, stream).await
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let allowed = self
            .deletes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(AppError::storage(format!("Injected delete failure: {path}")));
        }
        self.inner.delete(path).await
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
        self.inner.delete_prefix(prefix).await
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        self.inner.rename(from, to).await
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        self.inner.exists(path).await
    }

    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        self.inner.metadata(path).await
    }

    async fn presign_put(
        &self,
        path: &str,
        _expires_in_seconds: u64,
        checksum_sha256: Option<&str>,
    ) -> AppResult<Option<PresignedRequest>> {
        Ok(Some(PresignedRequest {
            method: "PUT".to_string(),
            url: format!("{DIRECT_SCHEME}{path}"),
            headers: checksum_sha256
                .map(|c| vec![("x-amz-checksum-sha256".to_string(), c.to_string())])
                .unwrap_or_default(),
        }))
    }
}
