//! HTTP tests for registration, login, and account endpoints.

mod helpers;

use std::io::Cursor;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{Value, json};

use helpers::{PASSWORD, TestApp, error_code};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.server.get("/api/health").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn test_register_returns_token_and_profile() {
    let app = TestApp::new().await;
    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
        }))
        .await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "Bearer");
    let user = &body["data"]["user"];
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email_validated"], false);
    assert_eq!(user["avatar"]["small"], "/static/account/avatar/default.gif");
    assert!(user["home_path"].as_str().unwrap().starts_with("user_uploads/"));
}

#[tokio::test]
async fn test_register_conflicts_and_weak_password() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "other@example.com",
            "password": PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response.json::<Value>()), "username-taken");

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "bob",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "weak-password");
}

#[tokio::test]
async fn test_login_by_username_and_email() {
    let app = TestApp::new().await;
    app.register("alice").await;

    for login in ["alice", "alice@example.com"] {
        let response = app
            .server
            .post("/api/auth/login")
            .json(&json!({ "login": login, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
    }

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response.json::<Value>()), "invalid-credentials");
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/account/profile").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response.json::<Value>()), "login-required");

    let response = app
        .server
        .get("/api/account/profile")
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_email_validation_flow() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let mail_token = app.mailed_token("alice@example.com").await;
    let response = app
        .server
        .post("/api/account/email/validate")
        .authorization_bearer(&token)
        .json(&json!({ "token": mail_token }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["email_validated"], true);

    let response = app
        .server
        .post("/api/account/email/validate")
        .authorization_bearer(&token)
        .json(&json!({ "token": mail_token }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "invalid-token");
}

#[tokio::test]
async fn test_resend_is_throttled() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let response = app
        .server
        .post("/api/account/email/resend")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&response.json::<Value>()), "email-change-throttled");
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let response = app
        .server
        .put("/api/account/profile")
        .authorization_bearer(&token)
        .json(&json!({ "nick": "Al", "language": "zh-hans" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["display_name"], "Al");
    assert_eq!(body["data"]["language"], "zh-hans");

    let response = app
        .server
        .put("/api/account/profile")
        .authorization_bearer(&token)
        .json(&json!({ "language": "klingon" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "invalid-language");

    let response = app
        .server
        .put("/api/account/password")
        .authorization_bearer(&token)
        .json(&json!({
            "current_password": PASSWORD,
            "new_password": "quiet-meadow-compass-77",
        }))
        .await;
    response.assert_status_ok();

    app.server
        .post("/api/auth/login")
        .json(&json!({ "login": "alice", "password": "quiet-meadow-compass-77" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    app.register("alice").await;

    app.server
        .post("/api/auth/password-reset")
        .json(&json!({ "email": "nobody@example.com" }))
        .await
        .assert_status_ok();

    app.server
        .post("/api/auth/password-reset")
        .json(&json!({ "email": "alice@example.com" }))
        .await
        .assert_status_ok();
    let reset = app.mailed_token("alice@example.com").await;

    let confirm = json!({ "token": reset, "new_password": "amber-orchard-river-19" });
    app.server
        .post("/api/auth/password-reset/confirm")
        .json(&confirm)
        .await
        .assert_status_ok();
    app.server
        .post("/api/auth/password-reset/confirm")
        .json(&confirm)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/auth/login")
        .json(&json!({ "login": "alice", "password": "amber-orchard-river-19" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_users_are_listed_and_found() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    app.register("bob").await;

    let response = app
        .server
        .get("/api/users")
        .authorization_bearer(&token)
        .add_query_param("per_page", 1)
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["total_items"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["has_next"], true);
    assert!(body["data"]["items"][0].get("email").is_none());

    let response = app
        .server
        .get("/api/users/nobody")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&response.json::<Value>()), "user-does-not-exist");
}

#[tokio::test]
async fn test_avatar_endpoints() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let response = app.server.get("/api/users/alice/avatar/small").await;
    response.assert_status(StatusCode::TEMPORARY_REDIRECT);

    let form = MultipartForm::new().add_part(
        "avatar",
        Part::bytes(png(300, 200)).file_name("me.png").mime_type("image/png"),
    );
    let response = app
        .server
        .post("/api/account/avatar")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status_ok();
    let small_url = response.json::<Value>()["data"]["avatar"]["small"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(small_url.starts_with("/api/users/alice/avatar/small?v="));

    let response = app.server.get("/api/users/alice/avatar/small").await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
    let small = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!(small.width(), 64);

    app.server
        .get("/api/users/alice/avatar/huge")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/account/avatar/crop")
        .authorization_bearer(&token)
        .json(&json!({ "x": 0.0, "y": 0.0, "width": 150.0, "height": 150.0 }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .delete("/api/account/avatar")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["data"]["avatar"]["large"],
        "/static/account/avatar/default.gif"
    );
}
