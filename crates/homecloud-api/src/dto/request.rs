//! Request DTOs with validation.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use homecloud_core::error::AppError;
use homecloud_entity::user::UpdateProfile;
use homecloud_service::account::RegisterInput;
use homecloud_service::cloud::{NodeChange, RegisterFile};
use homecloud_storage::imaging::CropBox;

use crate::error::ApiError;

/// Run the derived validation rules, turning failures into a 400.
pub fn validated<T: Validate>(req: T) -> Result<T, ApiError> {
    req.validate().map_err(validation_error)?;
    Ok(req)
}

fn validation_error(errors: ValidationErrors) -> ApiError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reason = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "is invalid".to_string());
            format!("{field}: {reason}")
        })
        .collect();
    fields.sort();
    AppError::validation(fields.join("; ")).into()
}

/// Distinguishes an absent key from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ── Auth ─────────────────────────────────────────────────────

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub language: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            language: req.language,
        }
    }
}

/// Login request body. `login` is a username or an email address.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub login: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordResetConfirmRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

// ── Account ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ValidateEmailRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 64, message = "Nickname is too long"))]
    pub nick: Option<String>,
    pub language: Option<String>,
}

impl From<UpdateProfileRequest> for UpdateProfile {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            nick: req.nick,
            language: req.language,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangeEmailRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

/// Password change request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Current password.
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    /// New password.
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Crop rectangle in pixels of the stored original.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CropAvatarRequest {
    #[validate(range(min = 0.0, message = "x must not be negative"))]
    pub x: f64,
    #[validate(range(min = 0.0, message = "y must not be negative"))]
    pub y: f64,
    #[validate(range(exclusive_min = 0.0, message = "width must be positive"))]
    pub width: f64,
    #[validate(range(exclusive_min = 0.0, message = "height must be positive"))]
    pub height: f64,
}

impl From<CropAvatarRequest> for CropBox {
    fn from(req: CropAvatarRequest) -> Self {
        Self {
            x: req.x,
            y: req.y,
            width: req.width,
            height: req.height,
        }
    }
}

// ── Cloud ────────────────────────────────────────────────────

/// Create directory request. No `parent_id` means the owner root.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDirectoryRequest {
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Rename and/or move a directory or file.
///
/// Omitting `parent_id` keeps the parent; `"parent_id": null` moves the
/// node to the owner root.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateNodeRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<Uuid>>,
}

impl From<UpdateNodeRequest> for NodeChange {
    fn from(req: UpdateNodeRequest) -> Self {
        Self {
            name: req.name,
            parent_id: req.parent_id,
        }
    }
}

/// Register file request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterFileRequest {
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "Size cannot be negative"))]
    pub size_bytes: Option<i64>,
    pub checksum: Option<String>,
}

impl From<RegisterFileRequest> for RegisterFile {
    fn from(req: RegisterFileRequest) -> Self {
        Self {
            parent_id: req.parent_id,
            name: req.name,
            size_bytes: req.size_bytes,
            checksum: req.checksum,
        }
    }
}

/// Commit a presigned upload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteUploadRequest {
    pub upload_id: Uuid,
    #[validate(length(min = 1, message = "Checksum is required"))]
    pub checksum: String,
}

/// `?path=` for virtual path lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub path: String,
}

/// `?checksum=` fallback for raw-body uploads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecksumQuery {
    pub checksum: Option<String>,
}
