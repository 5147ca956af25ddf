mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app, get, test_config};
use curio_api::router::build_app_router;
use curio_api::state::AppState;
use curio_core::store::memory::MemoryStore;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_memory_store() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
    assert_eq!(json["db_healthy"], true);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let response = get(app, "/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let response = get(app, "/api/v1/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_cors_origins_are_skipped() {
    let mut config = test_config();
    config.cors_origins.push("not a\norigin".to_string());
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        pool: None,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/quests")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "PATCH")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(preflight).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}
