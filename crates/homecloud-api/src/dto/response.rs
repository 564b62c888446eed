//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use homecloud_auth::jwt::AccessToken;
use homecloud_core::types::pagination::PageResponse;
use homecloud_entity::user::User;
use homecloud_service::account::{AvatarService, AvatarUrls};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Acknowledgement for operations without a resource to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub code: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

/// What other users can see about an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub nick: Option<String>,
    pub avatar: AvatarUrls,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User, avatars: &AvatarService) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name().to_string(),
            nick: user.nick.clone(),
            avatar: avatars.urls(user),
            created_at: user.created_at,
        }
    }
}

/// The caller's own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub email_validated: bool,
    pub display_name: String,
    pub nick: Option<String>,
    pub language: String,
    pub role: String,
    pub home_path: String,
    pub avatar: AvatarUrls,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl ProfileResponse {
    pub fn from_user(user: &User, avatars: &AvatarService) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            email_validated: user.email_validated,
            display_name: user.display_name().to_string(),
            nick: user.nick.clone(),
            language: user.language.clone(),
            role: user.role.to_string(),
            home_path: user.home_path(),
            avatar: avatars.urls(user),
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Register/login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: ProfileResponse,
}

impl AuthResponse {
    pub fn new(token: AccessToken, user: &User, avatars: &AvatarService) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_at: token.expires_at,
            user: ProfileResponse::from_user(user, avatars),
        }
    }
}

/// Re-wrap a page with converted items.
pub fn map_page<T, U, F>(page: PageResponse<T>, f: F) -> PageResponse<U>
where
    T: Serialize,
    U: Serialize,
    F: FnMut(T) -> U,
{
    PageResponse {
        items: page.items.into_iter().map(f).collect(),
        page: page.page,
        page_size: page.page_size,
        total_items: page.total_items,
        total_pages: page.total_pages,
        has_next: page.has_next,
        has_previous: page.has_previous,
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub storage: bool,
}
