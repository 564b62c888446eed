//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use homecloud_auth::jwt::JwtDecoder;
use homecloud_core::config::AppConfig;
use homecloud_database::Database;
use homecloud_service::account::{AccountService, AvatarService};
use homecloud_service::cloud::{DirectoryService, FileService, TransferService};
use homecloud_service::{Mailer, Services};
use homecloud_storage::StorageManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// Persistence backend
    pub db: Database,
    /// Object storage
    pub storage: StorageManager,

    // ── Auth ─────────────────────────────────────────────────
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,

    // ── Services ─────────────────────────────────────────────
    pub accounts: Arc<AccountService>,
    pub avatars: Arc<AvatarService>,
    pub directories: Arc<DirectoryService>,
    pub files: Arc<FileService>,
    pub transfers: Arc<TransferService>,
}

impl AppState {
    /// Wire every service on top of the given infrastructure.
    pub fn new(
        config: AppConfig,
        db: Database,
        storage: StorageManager,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let services = Services::new(db.clone(), storage.clone(), mailer, &config);
        Self {
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            config: Arc::new(config),
            db,
            storage,
            accounts: services.accounts,
            avatars: services.avatars,
            directories: services.directories,
            files: services.files,
            transfers: services.transfers,
        }
    }
}
