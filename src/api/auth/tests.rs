use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn signup_login_me_roundtrip() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "teacher@example.com",
                "password": "super-secret",
                "full_name": "Ada Teacher",
                "role": "teacher"
            })),
        ))
        .await
        .expect("signup");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["user"]["email"], "teacher@example.com");
    assert_eq!(created["user"]["role"], "teacher");
    assert!(created["access_token"].as_str().is_some_and(|token| !token.is_empty()));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "teacher@example.com",
                "password": "super-secret"
            })),
        ))
        .await
        .expect("login");

    let status = response.status();
    let logged_in = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {logged_in}");
    let token = logged_in["access_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");

    let status = response.status();
    let me = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {me}");
    assert_eq!(me["email"], "teacher@example.com");
    assert_eq!(me["full_name"], "Ada Teacher");
}

#[tokio::test]
async fn signup_rejects_invalid_payloads() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": "not-an-email", "password": "super-secret"})),
        ))
        .await
        .expect("signup bad email");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": "ok@example.com", "password": "short"})),
        ))
        .await
        .expect("signup short password");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let ctx = test_support::setup_test_context().await;

    test_support::insert_student(ctx.state.db(), "taken@example.com").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": "taken@example.com", "password": "super-secret"})),
        ))
        .await
        .expect("signup duplicate");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let ctx = test_support::setup_test_context().await;

    test_support::insert_student(ctx.state.db(), "student@example.com").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "student@example.com", "password": "wrong-password"})),
        ))
        .await
        .expect("login wrong password");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_a_token() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", None, None))
        .await
        .expect("me without token");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
