//! Wiring of every service from the shared infrastructure.

use std::sync::Arc;

use homecloud_core::config::AppConfig;
use homecloud_database::Database;
use homecloud_storage::StorageManager;

use crate::account::{AccountService, AvatarService};
use crate::cloud::{DirectoryService, FileService, Namespace, TransferService};
use crate::mail::Mailer;

/// All services, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Services {
    pub accounts: Arc<AccountService>,
    pub avatars: Arc<AvatarService>,
    pub directories: Arc<DirectoryService>,
    pub files: Arc<FileService>,
    pub transfers: Arc<TransferService>,
}

impl Services {
    pub fn new(
        db: Database,
        storage: StorageManager,
        mailer: Arc<dyn Mailer>,
        config: &AppConfig,
    ) -> Self {
        let ns = Namespace::new(db.clone(), storage.clone(), &config.cloud);
        Self {
            accounts: Arc::new(AccountService::new(db.clone(), mailer, config)),
            avatars: Arc::new(AvatarService::new(db, storage, &config.account)),
            directories: Arc::new(DirectoryService::new(ns.clone())),
            files: Arc::new(FileService::new(ns.clone())),
            transfers: Arc::new(TransferService::new(
                ns,
                &config.server.public_url,
                config.storage.max_upload_size_bytes,
                config.storage.presign_expiry_seconds,
            )),
        }
    }
}
