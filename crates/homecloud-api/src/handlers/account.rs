//! Handlers for the caller's own account.

use axum::Json;
use axum::extract::State;

use crate::dto::request::{
    ChangeEmailRequest, ChangePasswordRequest, UpdateProfileRequest, ValidateEmailRequest,
};
use crate::dto::response::{MessageResponse, ProfileResponse};
use crate::dto::validated;
use crate::extractors::AuthUser;
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// GET /api/account/profile
pub async fn get_profile(State(state): State<AppState>, auth: AuthUser) -> ApiResult<ProfileResponse> {
    let user = state.accounts.profile(&auth).await?;
    ok(ProfileResponse::from_user(&user, &state.avatars))
}

/// PUT /api/account/profile
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<ProfileResponse> {
    let req = validated(req)?;
    let user = state.accounts.update_profile(&auth, req.into()).await?;
    ok(ProfileResponse::from_user(&user, &state.avatars))
}

/// PUT /api/account/email
pub async fn change_email(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ChangeEmailRequest>,
) -> ApiResult<ProfileResponse> {
    let req = validated(req)?;
    let user = state.accounts.change_email(&auth, &req.email).await?;
    ok(ProfileResponse::from_user(&user, &state.avatars))
}

/// POST /api/account/email/resend
pub async fn resend_validation(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<MessageResponse> {
    state.accounts.resend_validation(&auth).await?;
    ok(MessageResponse::new(
        "Validation email sent",
        "validation-email-sent",
    ))
}

/// POST /api/account/email/validate
pub async fn validate_email(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ValidateEmailRequest>,
) -> ApiResult<ProfileResponse> {
    let req = validated(req)?;
    let user = state.accounts.validate_email(&auth, &req.token).await?;
    ok(ProfileResponse::from_user(&user, &state.avatars))
}

/// PUT /api/account/password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<MessageResponse> {
    let req = validated(req)?;
    state
        .accounts
        .change_password(&auth, &req.current_password, &req.new_password)
        .await?;
    ok(MessageResponse::new("Password changed", "password-changed"))
}
