//! Route definitions for the HomeCloud HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(account_routes())
        .merge(user_routes())
        .merge(directory_routes())
        .merge(cloud_routes())
        .merge(file_routes());

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Registration, login, password reset
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route(
            "/auth/password-reset",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        )
}

/// The caller's own profile, email, password, avatar
fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/account/profile",
            get(handlers::account::get_profile).put(handlers::account::update_profile),
        )
        .route("/account/email", put(handlers::account::change_email))
        .route(
            "/account/email/resend",
            post(handlers::account::resend_validation),
        )
        .route(
            "/account/email/validate",
            post(handlers::account::validate_email),
        )
        .route("/account/password", put(handlers::account::change_password))
        .route(
            "/account/avatar",
            post(handlers::avatar::upload_avatar).delete(handlers::avatar::delete_avatar),
        )
        .route("/account/avatar/crop", post(handlers::avatar::crop_avatar))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::user::list_users))
        .route("/users/{username}", get(handlers::user::get_user))
        .route(
            "/users/{username}/avatar/{size}",
            get(handlers::avatar::get_avatar),
        )
}

fn directory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/directories",
            get(handlers::directory::list_root).post(handlers::directory::create_directory),
        )
        .route(
            "/directories/{id}",
            get(handlers::directory::get_directory)
                .patch(handlers::directory::update_directory)
                .delete(handlers::directory::delete_directory),
        )
        .route(
            "/directories/{id}/children",
            get(handlers::directory::list_children),
        )
}

fn cloud_routes() -> Router<AppState> {
    Router::new()
        .route("/cloud/tree", get(handlers::cloud::tree))
        .route("/cloud/lookup", get(handlers::cloud::lookup))
}

/// File records and content transfer
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", post(handlers::file::register_file))
        .route(
            "/files/{id}",
            get(handlers::file::get_file)
                .patch(handlers::file::update_file)
                .delete(handlers::file::delete_file),
        )
        .route(
            "/files/{id}/upload-request",
            post(handlers::transfer::upload_request),
        )
        .route(
            "/files/{id}/download-request",
            post(handlers::transfer::download_request),
        )
        .route(
            "/files/{id}/upload-complete",
            post(handlers::transfer::upload_complete),
        )
        .route(
            "/files/{id}/content",
            get(handlers::transfer::download)
                .put(handlers::transfer::upload_raw)
                .post(handlers::transfer::upload_multipart)
                .delete(handlers::file::delete_content),
        )
}
