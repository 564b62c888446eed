//! Public user directory.

use axum::extract::{Path, Query, State};

use homecloud_core::types::pagination::PageResponse;

use crate::dto::response::{UserResponse, map_page};
use crate::extractors::{AuthUser, PaginationParams};
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PageResponse<UserResponse>> {
    let page = state
        .accounts
        .list_users(&params.into_page_request())
        .await?;
    ok(map_page(page, |u| UserResponse::from_user(&u, &state.avatars)))
}

/// GET /api/users/{username}
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(username): Path<String>,
) -> ApiResult<UserResponse> {
    let user = state.accounts.find_by_username(&username).await?;
    ok(UserResponse::from_user(&user, &state.avatars))
}
