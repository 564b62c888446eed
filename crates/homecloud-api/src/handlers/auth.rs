//! Auth handlers: register, login, password reset.

use axum::Json;
use axum::extract::State;

use crate::dto::request::{
    LoginRequest, PasswordResetConfirmRequest, PasswordResetRequest, RegisterRequest,
};
use crate::dto::response::{AuthResponse, MessageResponse};
use crate::dto::validated;
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let req = validated(req)?;
    let (user, token) = state.accounts.register(req.into()).await?;
    ok(AuthResponse::new(token, &user, &state.avatars))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let req = validated(req)?;
    let (user, token) = state.accounts.login(&req.login, &req.password).await?;
    ok(AuthResponse::new(token, &user, &state.avatars))
}

/// POST /api/auth/password-reset
///
/// Answers the same way whether or not the address is known.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<MessageResponse> {
    let req = validated(req)?;
    state.accounts.request_password_reset(&req.email).await?;
    ok(MessageResponse::new(
        "If the address belongs to an account, a reset link has been sent",
        "password-reset-sent",
    ))
}

/// POST /api/auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> ApiResult<MessageResponse> {
    let req = validated(req)?;
    state
        .accounts
        .confirm_password_reset(&req.token, &req.new_password)
        .await?;
    ok(MessageResponse::new("Password has been reset", "password-reset"))
}
