//! Shared helpers for API integration tests.
//!
//! Builds the application router with the same middleware stack production
//! uses, mints JWTs with the test secret, and seeds the entity hierarchy
//! (user -> video -> clip) the export pipeline consumes.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use rewind_api::auth::jwt::{generate_access_token, JwtConfig};
use rewind_api::config::ServerConfig;
use rewind_api::router::build_app_router;
use rewind_api::state::AppState;
use rewind_core::types::DbId;
use rewind_db::models::clip::{Clip, CreateClip};
use rewind_db::models::user::User;
use rewind_db::models::video::Video;
use rewind_db::repositories::{ClipRepo, UserRepo, VideoRepo};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Mint an access token with the test secret.
pub fn token_for(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> User {
    UserRepo::create(pool, username, role).await.unwrap()
}

/// Create a video and one clip owned by `user_id`.
pub async fn seed_clip(pool: &PgPool, user_id: DbId) -> (Video, Clip) {
    let video = VideoRepo::create(pool, "Match Night", "/library/match-night.mp4")
        .await
        .unwrap();
    let clip = ClipRepo::create(
        pool,
        &CreateClip {
            video_id: video.id,
            title: "Goal Replay".to_string(),
            start_secs: 12.0,
            end_secs: 31.5,
            created_by: user_id,
        },
    )
    .await
    .unwrap();
    (video, clip)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post(app: Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::POST, uri, token, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, uri, token, Some(body)).await
}

// ---------------------------------------------------------------------------
// Body helpers
// ---------------------------------------------------------------------------

/// Collect a finite response body to a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a finite response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Read the first data frame from a streaming (SSE) body without waiting
/// for the stream to end.
pub async fn first_frame(response: Response) -> String {
    let mut body = response.into_body();
    loop {
        let frame = body
            .frame()
            .await
            .expect("stream ended before a data frame")
            .expect("frame error");
        if let Ok(data) = frame.into_data() {
            return String::from_utf8(data.to_vec()).unwrap();
        }
    }
}
