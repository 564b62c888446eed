//! Store traits the service layer depends on, and the backend selector.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use homecloud_core::config::DatabaseConfig;
use homecloud_core::types::pagination::{PageRequest, PageResponse};
use homecloud_core::{AppError, AppResult};
use homecloud_entity::cloud::{
    CloudFile, CreateDirectory, CreateFile, Directory, NodeKind, Owner,
};
use homecloud_entity::user::{
    CreateUser, EmailHistory, EmailToken, PasswordResetToken, UpdateProfile, User,
};

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::repositories::{CloudRepository, TokenRepository, UserRepository};

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// Insert a user. Fails with `username-taken` / `email-taken`.
    async fn create_user(&self, data: &CreateUser) -> AppResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn list_users(&self, page: &PageRequest) -> AppResult<PageResponse<User>>;

    async fn update_profile(&self, id: Uuid, data: &UpdateProfile) -> AppResult<User>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Replace the email address and its validation state.
    async fn set_email(
        &self,
        id: Uuid,
        email: &str,
        validated: bool,
        sent_at: Option<DateTime<Utc>>,
    ) -> AppResult<User>;

    async fn mark_email_validated(&self, id: Uuid) -> AppResult<()>;

    async fn set_email_sent_at(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    async fn set_avatar_updated_at(&self, id: Uuid, at: Option<DateTime<Utc>>) -> AppResult<()>;

    async fn record_login(&self, id: Uuid) -> AppResult<()>;
}

/// One-shot tokens and the email ledger.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    async fn save_email_token(&self, token: &EmailToken) -> AppResult<()>;

    async fn find_email_token(&self, token: &str) -> AppResult<Option<EmailToken>>;

    /// Drop every outstanding validation token of a user.
    async fn delete_email_tokens_for(&self, user_id: Uuid) -> AppResult<()>;

    async fn save_reset_token(&self, token: &PasswordResetToken) -> AppResult<()>;

    async fn find_reset_token(&self, token: &str) -> AppResult<Option<PasswordResetToken>>;

    /// Drop every outstanding reset token of a user.
    async fn delete_reset_tokens_for(&self, user_id: Uuid) -> AppResult<()>;

    /// Insert or update the ledger row for `(user_id, email)`.
    async fn record_email(&self, user_id: Uuid, email: &str, activated: bool) -> AppResult<()>;

    async fn email_history(&self, user_id: Uuid) -> AppResult<Vec<EmailHistory>>;
}

/// A re-parent / rename of one namespace node with its recomputed paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate {
    pub id: Uuid,
    pub kind: NodeKind,
    pub parent_id: Option<Uuid>,
    /// Stored name; only changes when a move collides at the destination.
    pub name: String,
    pub virtual_name: String,
    pub path: String,
    pub virtual_path: String,
}

/// Cloud namespace persistence.
#[async_trait]
pub trait CloudStore: Send + Sync + std::fmt::Debug {
    async fn create_owner(&self, owner: &Owner) -> AppResult<Owner>;

    async fn find_owner(&self, user_id: Uuid) -> AppResult<Option<Owner>>;

    async fn create_directory(&self, data: &CreateDirectory) -> AppResult<Directory>;

    async fn find_directory(&self, id: Uuid) -> AppResult<Option<Directory>>;

    async fn find_directory_by_virtual_path(
        &self,
        owner_id: Uuid,
        virtual_path: &str,
    ) -> AppResult<Option<Directory>>;

    /// Directories directly under `parent_id` (`None` for the owner root).
    async fn list_child_directories(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<Directory>>;

    /// Every directory of an owner.
    async fn list_directories(&self, owner_id: Uuid) -> AppResult<Vec<Directory>>;

    async fn create_file(&self, data: &CreateFile) -> AppResult<CloudFile>;

    async fn find_file(&self, id: Uuid) -> AppResult<Option<CloudFile>>;

    async fn find_file_by_virtual_path(
        &self,
        owner_id: Uuid,
        virtual_path: &str,
    ) -> AppResult<Option<CloudFile>>;

    /// Files directly under `parent_id` (`None` for the owner root).
    async fn list_child_files(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<CloudFile>>;

    /// Every file of an owner.
    async fn list_files(&self, owner_id: Uuid) -> AppResult<Vec<CloudFile>>;

    /// Apply a batch of node updates atomically.
    async fn update_nodes(&self, updates: &[NodeUpdate]) -> AppResult<()>;

    /// Record uploaded content: flips `uploaded` and stores size/checksum.
    async fn set_file_content(
        &self,
        id: Uuid,
        size_bytes: i64,
        checksum: &str,
        content_type: Option<&str>,
    ) -> AppResult<CloudFile>;

    /// Forget uploaded content: clears `uploaded`, size and checksum.
    async fn clear_file_content(&self, id: Uuid) -> AppResult<CloudFile>;

    async fn delete_file(&self, id: Uuid) -> AppResult<bool>;

    /// Delete a directory together with every descendant directory and file.
    async fn delete_directory(&self, id: Uuid) -> AppResult<bool>;
}

/// The configured persistence backend, shared by all services.
#[derive(Debug, Clone)]
pub struct Database {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub cloud: Arc<dyn CloudStore>,
    pool: Option<DatabasePool>,
}

impl Database {
    /// Open the backend named by `config.provider`.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider.as_str() {
            "postgres" => {
                info!("Initializing PostgreSQL store");
                let pool = DatabasePool::connect_and_migrate(config).await?;
                Ok(Self::postgres(pool))
            }
            "memory" => {
                info!("Initializing in-memory store; data is lost on shutdown");
                Ok(Self::memory())
            }
            other => Err(AppError::configuration(format!(
                "Unknown database provider: '{other}'. Supported: postgres, memory"
            ))),
        }
    }

    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: DatabasePool) -> Self {
        let pg = pool.pool().clone();
        Self {
            users: Arc::new(UserRepository::new(pg.clone())),
            tokens: Arc::new(TokenRepository::new(pg.clone())),
            cloud: Arc::new(CloudRepository::new(pg)),
            pool: Some(pool),
        }
    }

    /// Fresh, empty in-process stores.
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            tokens: store.clone(),
            cloud: store,
            pool: None,
        }
    }

    /// Check backend connectivity.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.pool {
            Some(pool) => pool.health_check().await,
            None => Ok(true),
        }
    }

    /// The PostgreSQL pool, when running on PostgreSQL.
    pub fn pool(&self) -> Option<&DatabasePool> {
        self.pool.as_ref()
    }
}
