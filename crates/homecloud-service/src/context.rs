//! Request context carrying the authenticated user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use homecloud_auth::jwt::Claims;
use homecloud_entity::user::UserRole;

/// Who is acting on the current request.
///
/// Built by the API layer from the bearer token and passed into every
/// service method that needs an authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            request_time: Utc::now(),
        }
    }

    /// Context for the subject of a validated access token.
    pub fn from_claims(claims: &Claims) -> Self {
        Self::new(claims.sub, claims.username.clone(), claims.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
