//! Shared fixtures and request helpers for the HTTP integration tests.
//!
//! Tests send requests straight into the router via `tower::ServiceExt`,
//! so no TCP listener is involved. Each helper consumes the app; tests
//! that send several requests rebuild it from a cloned pool.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use labelkit_api::auth::jwt::{generate_access_token, JwtConfig};
use labelkit_api::auth::password::hash_password;
use labelkit_api::config::ServerConfig;
use labelkit_api::router::build_app_router;
use labelkit_api::state::AppState;
use labelkit_core::queue::AllocationMode;
use labelkit_core::roles::{ROLE_ADMIN, ROLE_ANNOTATOR};
use labelkit_core::types::DbId;
use labelkit_db::models::user::{CreateUser, User};
use labelkit_db::repositories::UserRepo;

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        allocation_mode: AllocationMode::SharedPool,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 480,
        },
    }
}

/// Build the full application router with all middleware layers, using
/// the given database pool.
///
/// Mirrors `main.rs` so integration tests exercise the same middleware
/// stack (CORS, request ID, timeout, tracing, panic recovery) that
/// production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

/// [`build_test_app`] with a custom config (e.g. assigned-only mode).
pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

/// Create a user directly in the database and return the row plus a
/// bearer token for it.
pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> (User, String) {
    let hashed = hash_password("test_password_123!").expect("hashing should succeed");
    let input = CreateUser {
        username: username.to_string(),
        display_name: format!("{username} (test)"),
        password_hash: hashed,
        role: role.to_string(),
    };
    let user = UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed");
    let token = generate_access_token(user.id, role, &test_config().jwt)
        .expect("token generation should succeed");
    (user, token)
}

/// Create an admin and return `(user, token)`.
pub async fn seed_admin(pool: &PgPool) -> (User, String) {
    seed_user(pool, "admin", ROLE_ADMIN).await
}

/// Create an annotator and return `(user, token)`.
pub async fn seed_annotator(pool: &PgPool, username: &str) -> (User, String) {
    seed_user(pool, username, ROLE_ANNOTATOR).await
}

/// Insert a category with the given option labels; returns the category
/// id and the option ids in label order.
pub async fn seed_category(
    pool: &PgPool,
    name: &str,
    allows_empty: bool,
    labels: &[&str],
) -> (DbId, Vec<DbId>) {
    let category_id: DbId = sqlx::query_scalar(
        "INSERT INTO categories (name, display_order, allows_empty)
         VALUES ($1, 100, $2)
         RETURNING id",
    )
    .bind(name)
    .bind(allows_empty)
    .fetch_one(pool)
    .await
    .expect("category insert should succeed");

    let mut option_ids = Vec::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO options (category_id, label, display_order)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(category_id)
        .bind(label)
        .bind(i as i32)
        .fetch_one(pool)
        .await
        .expect("option insert should succeed");
        option_ids.push(id);
    }
    (category_id, option_ids)
}

/// Insert an image and return its id.
pub async fn seed_image(pool: &PgPool, filename: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO images (filename, storage_path)
         VALUES ($1, $2)
         RETURNING id",
    )
    .bind(filename)
    .bind(format!("/data/images/{filename}"))
    .fetch_one(pool)
    .await
    .expect("image insert should succeed")
}

/// Put an annotator into a category's assignment set.
pub async fn assign_category(pool: &PgPool, user_id: DbId, category_id: DbId) {
    sqlx::query("INSERT INTO annotator_categories (user_id, category_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(category_id)
        .execute(pool)
        .await
        .expect("category assignment should succeed");
}

/// Exclusively assign an image to an annotator.
pub async fn assign_image(pool: &PgPool, user_id: DbId, image_id: DbId) {
    sqlx::query("INSERT INTO annotator_image_assignments (user_id, image_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(image_id)
        .execute(pool)
        .await
        .expect("image assignment should succeed");
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request without authentication.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a GET request with a bearer token.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a JSON POST request without authentication.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body, None).await
}

/// Send a JSON POST request with a bearer token.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    json_request(app, Method::POST, uri, body, Some(token)).await
}

/// Send a JSON PUT request with a bearer token.
pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    json_request(app, Method::PUT, uri, body, Some(token)).await
}

/// Send a JSON PATCH request with a bearer token.
pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    json_request(app, Method::PATCH, uri, body, Some(token)).await
}

/// Send a bodyless PUT request with a bearer token.
pub async fn put_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a DELETE request with a bearer token.
pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into parsed JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be valid JSON")
}
