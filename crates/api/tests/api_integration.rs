//! API integration tests.
//!
//! These tests drive the full router, including authentication and CORS layers,
//! against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use ideaboard_api::{AppState, app};
use ideaboard_common::{
    JwtManager, LocalStorage,
    config::{AuthConfig, Config, DatabaseConfig, ServerConfig, StorageConfig},
};
use ideaboard_db::{
    entities::{UserRole, idea_like, user},
    test_utils::fixtures,
};
use sea_orm::{DatabaseBackend, MockDatabase, Value};
use serde_json::Value as Json;
use tower::ServiceExt;

/// Create a test configuration.
fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            url: "http://localhost:8080".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7200,
        },
        storage: StorageConfig {
            upload_dir: PathBuf::from("target/test-uploads"),
            max_file_size: 1024 * 1024,
        },
    }
}

fn create_test_router(db: MockDatabase) -> Router {
    let config = create_test_config();
    let storage = Arc::new(LocalStorage::new(config.storage.upload_dir.clone()));
    let state = AppState::new(Arc::new(db.into_connection()), &config, storage);
    app(state, config.storage.max_file_size as usize)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn token_for(user_id: &str, username: &str, role: UserRole) -> String {
    JwtManager::new(&create_test_config().auth)
        .issue_access(user_id, username, role.as_str())
        .unwrap()
}

fn count_row(n: i64) -> BTreeMap<String, Value> {
    BTreeMap::from([("num_items".to_string(), Value::BigInt(Some(n)))])
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method(Method::GET);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Json {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_router(empty_db());

    let response = app.oneshot(get("/api/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "UP");
}

#[tokio::test]
async fn test_protected_route_without_token_is_unauthorized() {
    let app = create_test_router(empty_db());

    let response = app.oneshot(get("/api/ideas", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], 401);
    assert_eq!(json["error"], "Unauthorized");
    assert_eq!(json["message"], "Authentication required");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(get("/api/users/me", Some("not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate_requests() {
    let app = create_test_router(empty_db());
    let refresh = JwtManager::new(&create_test_config().auth)
        .issue_refresh("u1", "alice", "EMPLOYEE")
        .unwrap();

    let response = app
        .oneshot(get("/api/notifications", Some(&refresh)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_employee_cannot_export() {
    let app = create_test_router(empty_db());
    let token = token_for("u1", "alice", UserRole::Employee);

    let response = app
        .oneshot(get("/api/export/ideas/csv", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_audit_log_is_admin_only() {
    let app = create_test_router(empty_db());
    let token = token_for("u2", "pm", UserRole::ProjectManager);

    let response = app
        .oneshot(get("/api/audit", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Admin access required");
}

#[tokio::test]
async fn test_cors_preflight_mirrors_origin() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/ideas")
                .method(Method::OPTIONS)
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
}

#[tokio::test]
async fn test_login_unknown_user() {
    let db = empty_db().append_query_results([Vec::<user::Model>::new()]);
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            None,
            r#"{"username":"nobody","password":"secret1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid username or password");
}

#[tokio::test]
async fn test_register_rejects_short_username() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            None,
            r#"{"username":"ab","email":"ab@example.com","password":"secret1","firstName":"A","lastName":"B"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remaining_likes() {
    let db = empty_db().append_query_results([vec![count_row(1)]]);
    let app = create_test_router(db);
    let token = token_for("u1", "alice", UserRole::Employee);

    let response = app
        .oneshot(get("/api/users/me/likes/remaining", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["remainingLikes"], 2);
    assert_eq!(json["weeklyLikesUsed"], 1);
    assert_eq!(json["maxWeeklyLikes"], 3);
}

#[tokio::test]
async fn test_liking_own_idea_is_rejected() {
    let db = empty_db()
        .append_query_results([vec![count_row(0)]])
        .append_query_results([Vec::<idea_like::Model>::new()])
        .append_query_results([vec![fixtures::idea("i1", "u1", "Solar roof")]]);
    let app = create_test_router(db);
    let token = token_for("u1", "alice", UserRole::Employee);

    let response = app
        .oneshot(post_json("/api/ideas/i1/like", Some(&token), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "You cannot like your own idea");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_router(empty_db());

    let response = app.oneshot(get("/api/nope", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["status"], 404);
    assert_eq!(json["error"], "Not Found");
    assert_eq!(json["message"], "Resource not found");
    assert!(json["timestamp"].is_string());
}
