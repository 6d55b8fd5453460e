#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use cutline_core::memory::InMemoryStore;
use cutline_core::orphan::OrphanPolicy;
use cutline_core::scene::Scene;
use cutline_core::service::TimelineService;
use http_body_util::BodyExt;
use tower::ServiceExt;

use cutline_api::config::{ServerConfig, StoreBackend};
use cutline_api::router::build_app_router;
use cutline_api::state::AppState;

pub const EPISODE: i64 = 1;

/// Build a test `ServerConfig` with safe defaults and the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        orphan_policy: OrphanPolicy::Orphan,
        store: StoreBackend::Memory,
        database_url: None,
        seed_path: None,
    }
}

/// Seed episode 1 with S1 (10s), S2 (20s), S3 (15s).
pub async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for (id, order, duration) in [(1, 1, 10.0), (2, 2, 20.0), (3, 3, 15.0)] {
        store
            .upsert_scene(Scene {
                id,
                episode_id: EPISODE,
                order_index: order,
                duration_seconds: Some(duration),
            })
            .await;
    }
    store
}

/// Build the full application router over the given store, with the same
/// middleware stack as production.
pub fn build_test_app(store: Arc<InMemoryStore>) -> Router {
    let config = test_config();
    let service = TimelineService::new(store, config.orphan_policy);
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send_json(app: Router, method: Method, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn patch_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send_json(app, Method::PATCH, uri, body).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn placements_uri() -> String {
    format!("/api/v1/episodes/{EPISODE}/timeline/placements")
}
