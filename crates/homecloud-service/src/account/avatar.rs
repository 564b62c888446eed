//! Avatar upload, cropping, and delivery.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use homecloud_core::config::account::AccountConfig;
use homecloud_core::error::{AppError, ErrorKind, codes};
use homecloud_core::result::AppResult;
use homecloud_database::Database;
use homecloud_entity::user::User;
use homecloud_storage::StorageManager;
use homecloud_storage::imaging::avatar::{self, AvatarRenditions, CropBox};

use crate::context::RequestContext;

const ORIGINAL_FILE: &str = "original.png";

/// A stored avatar rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarSize {
    Original,
    Large,
    Middle,
    Small,
}

impl AvatarSize {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Original => ORIGINAL_FILE,
            Self::Large => "large.png",
            Self::Middle => "middle.png",
            Self::Small => "small.png",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Large => "large",
            Self::Middle => "middle",
            Self::Small => "small",
        }
    }
}

impl fmt::Display for AvatarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvatarSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Self::Original),
            "large" => Ok(Self::Large),
            "middle" => Ok(Self::Middle),
            "small" => Ok(Self::Small),
            other => Err(AppError::validation(format!(
                "Unknown avatar size '{other}'. Available: original, large, middle, small"
            ))),
        }
    }
}

/// Public URLs of every rendition of a user's avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarUrls {
    pub original: String,
    pub large: String,
    pub middle: String,
    pub small: String,
}

/// Manages user avatars in object storage.
#[derive(Debug, Clone)]
pub struct AvatarService {
    db: Database,
    storage: StorageManager,
    config: AccountConfig,
}

impl AvatarService {
    pub fn new(db: Database, storage: StorageManager, config: &AccountConfig) -> Self {
        Self {
            db,
            storage,
            config: config.clone(),
        }
    }

    async fn user(&self, ctx: &RequestContext) -> AppResult<User> {
        self.db
            .users
            .find_user_by_id(ctx.user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("User not found").with_code(codes::USER_DOES_NOT_EXIST)
            })
    }

    async fn store_renditions(&self, user: &User, renditions: AvatarRenditions) -> AppResult<()> {
        let base = user.avatar_path();
        for (size, data) in [
            (AvatarSize::Large, renditions.large),
            (AvatarSize::Middle, renditions.middle),
            (AvatarSize::Small, renditions.small),
        ] {
            self.storage
                .write(&format!("{base}{}", size.file_name()), data)
                .await?;
        }
        self.db
            .users
            .set_avatar_updated_at(user.id, Some(Utc::now()))
            .await
    }

    /// Store a new original and derive default renditions from its
    /// centered square.
    pub async fn upload(&self, ctx: &RequestContext, data: Bytes) -> AppResult<User> {
        let user = self.user(ctx).await?;
        let original =
            avatar::normalize_original_blocking(data, self.config.avatar.clone()).await?;
        self.storage
            .write(&format!("{}{ORIGINAL_FILE}", user.avatar_path()), original.clone())
            .await?;

        let renditions =
            avatar::crop_centered_blocking(original, self.config.avatar.clone()).await?;
        self.store_renditions(&user, renditions).await?;

        info!(user_id = %user.id, "Avatar uploaded");
        self.user(ctx).await
    }

    /// Re-crop the stored original.
    pub async fn crop(&self, ctx: &RequestContext, crop_box: CropBox) -> AppResult<User> {
        let user = self.user(ctx).await?;
        let original = self
            .storage
            .read_bytes(&format!("{}{ORIGINAL_FILE}", user.avatar_path()))
            .await
            .map_err(|e| match e.kind {
                ErrorKind::NotFound => AppError::not_found("Upload an avatar before cropping it")
                    .with_code(codes::AVATAR_NOT_UPLOADED),
                _ => e,
            })?;

        let renditions =
            avatar::crop_blocking(original, crop_box, self.config.avatar.clone()).await?;
        self.store_renditions(&user, renditions).await?;

        info!(user_id = %user.id, "Avatar cropped");
        self.user(ctx).await
    }

    /// Remove every rendition; the default avatar is served afterwards.
    pub async fn delete(&self, ctx: &RequestContext) -> AppResult<User> {
        let user = self.user(ctx).await?;
        self.storage.delete_prefix(&user.avatar_path()).await?;
        self.db.users.set_avatar_updated_at(user.id, None).await?;
        info!(user_id = %user.id, "Avatar deleted");
        self.user(ctx).await
    }

    /// URL of the placeholder shown for users without an avatar.
    pub fn default_url(&self) -> String {
        format!(
            "{}/account/avatar/default.gif",
            self.config.static_url.trim_end_matches('/')
        )
    }

    /// Rendition URLs carrying the last update time as a cache buster.
    pub fn urls(&self, user: &User) -> AvatarUrls {
        let url = |size: AvatarSize| match user.avatar_updated_at {
            Some(at) => format!(
                "/api/users/{}/avatar/{size}?v={}",
                user.username,
                at.timestamp()
            ),
            None => self.default_url(),
        };
        AvatarUrls {
            original: url(AvatarSize::Original),
            large: url(AvatarSize::Large),
            middle: url(AvatarSize::Middle),
            small: url(AvatarSize::Small),
        }
    }

    /// Rendition bytes, or `None` when the user has no avatar.
    pub async fn read(&self, username: &str, size: AvatarSize) -> AppResult<Option<Bytes>> {
        let user = self
            .db
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("User '{username}' not found"))
                    .with_code(codes::USER_DOES_NOT_EXIST)
            })?;
        if user.avatar_updated_at.is_none() {
            return Ok(None);
        }

        let path = format!("{}{}", user.avatar_path(), size.file_name());
        match self.storage.read_bytes(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind == ErrorKind::NotFound => {
                debug!(user_id = %user.id, %size, "Avatar rendition missing from storage");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
