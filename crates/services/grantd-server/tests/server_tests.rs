//! Integration tests for the grantd server
//!
//! These tests cover:
//! - Health check
//! - Registration, login and the password grant against the same accounts
//! - Bearer introspection and revocation through `/me`

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use base64::{Engine, engine::general_purpose::STANDARD};
use grantd_server::config::SeedUser;
use grantd_server::{AppState, Config, build_router};
use serde_json::{Value, json};

async fn test_app() -> (TestServer, AppState) {
    let mut config = Config::default();
    config.auth.jwt_secret = "server-test-secret".to_string();
    config.auth.token_ttl_seconds = 900;
    config.users = vec![
        SeedUser {
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            password: "admin-password".to_string(),
            active: true,
        },
        SeedUser {
            email: "suspended@example.com".to_string(),
            name: "Suspended".to_string(),
            password: "suspended-password".to_string(),
            active: false,
        },
    ];

    let state = AppState::from_config(&config).await.unwrap();
    let server = TestServer::new(build_router(state.clone())).unwrap();
    (server, state)
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

async fn password_grant(server: &TestServer, username: &str, password: &str) -> axum_test::TestResponse {
    let client = STANDARD.encode("todo-web:todo-secret");
    server
        .post("/oauth/token")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {client}")).unwrap(),
        )
        .content_type("application/x-www-form-urlencoded")
        .text(format!(
            "grant_type=password&username={}&password={}",
            username.replace('@', "%40"),
            password
        ))
        .await
}

#[tokio::test]
async fn test_health_check() {
    let (server, _) = test_app().await;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_register_then_password_grant() {
    let (server, _) = test_app().await;

    let response = server
        .post("/register")
        .json(&json!({
            "email": "Carol@Example.com",
            "name": "Carol",
            "password": "carol-password"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["message"], "User registered successfully");
    let user_id = body["user_id"].as_str().unwrap().to_string();

    let response = password_grant(&server, "carol@example.com", "carol-password").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let tokens: Value = response.json();
    assert_eq!(tokens["expires_in"], 900);
    let access_token = tokens["access_token"].as_str().unwrap();

    let response = server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer(access_token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let me: Value = response.json();
    assert_eq!(me["subject_id"], user_id.as_str());
}

#[tokio::test]
async fn test_register_validation() {
    let (server, _) = test_app().await;

    let response = server
        .post("/register")
        .json(&json!({ "email": "dave@example.com", "password": "short" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("at least 8"));

    let response = server
        .post("/register")
        .json(&json!({ "email": "not-an-email", "password": "long-enough" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/register")
        .json(&json!({ "email": "ADMIN@example.com", "password": "another-password" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_login() {
    let (server, _) = test_app().await;

    let response = server
        .post("/login")
        .json(&json!({ "email": "admin@example.com", "password": "admin-password" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let body: Value = response.json();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_failures() {
    let (server, _) = test_app().await;

    for (email, password) in [
        ("admin@example.com", "wrong-password"),
        ("nobody@example.com", "admin-password"),
        ("suspended@example.com", "suspended-password"),
    ] {
        let response = server
            .post("/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>(), json!({ "error": "Invalid credentials" }));
    }

    let response = server
        .post("/login")
        .json(&json!({ "email": " ", "password": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inactive_seed_user_cannot_get_a_token() {
    let (server, _) = test_app().await;

    let response = password_grant(&server, "suspended@example.com", "suspended-password").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": "invalid_grant" }));
}

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let (server, _) = test_app().await;

    let response = server.get("/me").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let response = server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer("not-a-jwt"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn test_revoked_token_is_rejected() {
    let (server, state) = test_app().await;

    let response = password_grant(&server, "admin@example.com", "admin-password").await;
    let tokens: Value = response.json();
    let access_token = tokens["access_token"].as_str().unwrap().to_string();

    let me: Value = server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer(&access_token))
        .await
        .json();
    let token_id = me["token_id"].as_str().unwrap();

    assert!(state.issuer.revoke(token_id).await);

    let response = server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer(&access_token))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}
