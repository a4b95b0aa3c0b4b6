//! Authentication API integration tests
//!
//! Login, logout, session status and health, driven through the router with
//! `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use socialnet::backend::auth::Session;
use socialnet::backend::routes::create_router;
use tower::ServiceExt;

use crate::common::{TestApp, TEST_PASSWORD};

fn router(app: &TestApp) -> Router {
    create_router(app.state.clone())
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = router(app).oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cookie, body)
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::post("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

fn with_session(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("session_id={}", token))
        .body(Body::empty())
        .unwrap()
}

fn cookie_token(cookie: &str) -> String {
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("session_id="))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;

    let (status, cookie, body) = send(&app, login_request(&alice.email, TEST_PASSWORD)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nickname"], "alice");
    let cookie = cookie.expect("login should set a cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));

    let token = cookie_token(&cookie);
    let (status, _, body) = send(&app, with_session("GET", "/api/auth/status", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "authenticated": true, "nickname": "alice" }));
}

#[tokio::test]
async fn test_login_replaces_previous_session() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;

    let (_, cookie, _) = send(&app, login_request(&alice.email, TEST_PASSWORD)).await;
    let token = cookie_token(&cookie.unwrap());
    assert_ne!(token, alice.token);

    let (status, _, _) = send(&app, with_session("GET", "/api/auth/status", &alice.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;

    let (status, cookie, body) = send(&app, login_request(&alice.email, "wrong password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(body["status"], 401);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _, body) = send(&app, login_request("nobody@example.com", TEST_PASSWORD)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_status_requires_valid_session() {
    let app = TestApp::spawn().await;

    let request = Request::get("/api/auth/status").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized", "status": 401 }));

    let (status, _, _) = send(&app, with_session("GET", "/api/auth/status", "not-a-uuid")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown = uuid::Uuid::new_v4().to_string();
    let (status, _, _) = send(&app, with_session("GET", "/api/auth/status", &unknown)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_is_rejected_and_removed() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let expired = Session {
        token: uuid::Uuid::new_v4().to_string(),
        user_id: alice.id,
        expires_at: Utc::now() - ChronoDuration::minutes(5),
    };
    app.state.sessions.insert_session(&expired).await.unwrap();

    let (status, _, _) = send(&app, with_session("GET", "/api/auth/status", &expired.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE session = ?")
        .bind(&expired.token)
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;

    let (status, cookie, _) = send(&app, with_session("POST", "/api/logout", &alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.unwrap().contains("Max-Age=0"));

    let (status, _, _) = send(&app, with_session("GET", "/api/auth/status", &alice.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_connection_count() {
    let app = TestApp::spawn().await;

    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "connections": 0 }));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::spawn().await;

    let request = Request::get("/nope").body(Body::empty()).unwrap();
    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
