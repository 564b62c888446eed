//! Whole-namespace views.

use axum::extract::{Query, State};

use homecloud_entity::cloud::TreeEntry;
use homecloud_service::cloud::LookupResult;

use crate::dto::request::LookupQuery;
use crate::extractors::AuthUser;
use crate::handlers::{ApiResult, ok};
use crate::state::AppState;

/// GET /api/cloud/tree
pub async fn tree(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Vec<TreeEntry>> {
    ok(state.directories.tree(&auth).await?)
}

/// GET /api/cloud/lookup?path=alice/docs/a.txt
pub async fn lookup(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<LookupQuery>,
) -> ApiResult<LookupResult> {
    ok(state.directories.lookup(&auth, &query.path).await?)
}
