#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chatline::{ServerConfig, create_app, create_app_with_clock, db::Database, jwt::Clock};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Raw signing key for test apps (tests bypass the base64 CLI wrapper).
pub const TEST_SECRET: &[u8] = b"test-jwt-secret-for-testing-1234";

pub const TEST_IP: &str = "203.0.113.7";
pub const ALT_IP: &str = "198.51.100.9";

pub const TEST_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// Create a test app backed by an in-memory database.
pub async fn create_test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
    };
    (create_app(&config), db)
}

/// Create an app over an existing database with a pinned clock.
/// Used to observe the same store from two points in time.
pub fn app_at(db: &Database, now: u64) -> Router {
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
    };
    create_app_with_clock(&config, Clock::fixed(now))
}

/// POST a JSON body with the standard test IP and User-Agent headers.
pub async fn post_json(app: &Router, uri: &str, ip: &str, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("x-forwarded-for", ip)
                .header("user-agent", TEST_UA)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// GET with an optional bearer token.
pub async fn get_with_bearer(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", TEST_IP)
        .header("user-agent", TEST_UA);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Parse a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user and return the response `data` object
/// (accessToken, refreshToken, tokenType, user).
pub async fn register_user(app: &Router, email: &str, username: &str, ip: &str) -> Value {
    let response = post_json(
        app,
        "/api/v1/auth/register",
        ip,
        json!({
            "email": email,
            "username": username,
            "password": "password123",
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    body["data"].clone()
}
