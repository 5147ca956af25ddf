#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use curio_core::collection::User;
use curio_core::leaderboard::LeaderboardEntry;
use curio_core::quest::{ArtefactRef, Quest, QuestType};
use curio_core::store::memory::MemoryStore;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use curio_api::config::ServerConfig;
use curio_api::router::build_app_router;
use curio_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        seed_quests_path: None,
    }
}

/// Build the full application router over the given in-memory store.
///
/// Uses the same builder as the binary, so tests exercise the production
/// middleware stack.
pub fn build_test_app(store: Arc<MemoryStore>) -> Router {
    let config = test_config();
    let state = AppState {
        store,
        pool: None,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn quest(quest_id: &str, quest_type: QuestType, artefacts: &[&str]) -> Quest {
    Quest {
        quest_id: quest_id.to_string(),
        title: format!("Quest {quest_id}"),
        quest_type,
        artefacts: artefacts
            .iter()
            .map(|id| ArtefactRef {
                artefact_id: id.to_string(),
                name: id.to_string(),
                hints: vec![format!("{id} hint 1"), format!("{id} hint 2")],
            })
            .collect(),
        date_range: None,
        prize: Some("Gift shop voucher".to_string()),
        leaderboard: Vec::new(),
    }
}

pub fn with_board(mut quest: Quest, users: &[(&str, i64)]) -> Quest {
    quest.leaderboard = users
        .iter()
        .map(|(user_id, time_taken)| LeaderboardEntry {
            user_id: user_id.to_string(),
            time_taken: Some(*time_taken),
            prize: None,
        })
        .collect();
    quest
}

pub fn user(user_id: &str) -> User {
    User {
        user_id: user_id.to_string(),
        email: format!("{user_id}@museum.test"),
        collection: Default::default(),
    }
}

pub fn accepted_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(body)).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
