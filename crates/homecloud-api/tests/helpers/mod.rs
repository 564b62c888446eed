//! Shared setup for HTTP integration tests: the full router on the
//! in-memory store and a temporary local storage root.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{Value, json};
use tempfile::TempDir;

use homecloud_api::{AppState, build_app};
use homecloud_core::config::AppConfig;
use homecloud_database::Database;
use homecloud_service::MemoryMailer;
use homecloud_service::mail::token_from_body;
use homecloud_storage::StorageManager;
use homecloud_storage::providers::LocalStorageProvider;

pub const PASSWORD: &str = "violet-harbor-lantern-42";

/// Test application context
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    _root: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(mut config: AppConfig) -> Self {
        let root = tempfile::tempdir().expect("Failed to create storage root");
        config.storage.local.root_path = root.path().to_string_lossy().into_owned();
        config.server.public_url = "http://cloud.test".to_string();
        config.database.provider = "memory".to_string();

        let provider = LocalStorageProvider::new(&config.storage.local.root_path)
            .await
            .expect("Failed to init local storage");
        let storage =
            StorageManager::from_provider(Arc::new(provider), config.storage.presign_expiry_seconds);
        let mailer = Arc::new(MemoryMailer::new());
        let state = AppState::new(config, Database::memory(), storage, mailer.clone());

        let server = TestServer::new(build_app(state.clone())).expect("Failed to create test server");

        Self {
            server,
            state,
            mailer,
            _root: root,
        }
    }

    /// Register `username` and return its access token.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            }))
            .await;
        response.assert_status_ok();
        access_token(&response.json::<Value>())
    }

    /// Token from the most recent mail sent to `to`.
    pub async fn mailed_token(&self, to: &str) -> String {
        let mail = self.mailer.last_to(to).await.expect("No mail sent");
        token_from_body(&mail.body)
            .expect("Mail carries no token")
            .to_string()
    }

    /// Create a directory and return its id.
    pub async fn mkdir(&self, token: &str, parent_id: Option<&str>, name: &str) -> String {
        let response = self
            .server
            .post("/api/directories")
            .authorization_bearer(token)
            .json(&json!({ "parent_id": parent_id, "name": name }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"]["id"]
            .as_str()
            .expect("id")
            .to_string()
    }

    /// Register a file record and return its id.
    pub async fn register_file(&self, token: &str, parent_id: Option<&str>, name: &str) -> String {
        let response = self
            .server
            .post("/api/files")
            .authorization_bearer(token)
            .json(&json!({ "parent_id": parent_id, "name": name }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"]["id"]
            .as_str()
            .expect("id")
            .to_string()
    }
}

pub fn access_token(body: &Value) -> String {
    body["data"]["access_token"]
        .as_str()
        .expect("access_token")
        .to_string()
}

pub fn error_code(body: &Value) -> &str {
    body["code"].as_str().unwrap_or_default()
}
