//! HTTP-level tests for the collection full-replace endpoint.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{accepted_at, body_json, build_test_app, get, put_json, user};
use curio_core::store::memory::MemoryStore;
use curio_core::store::CollectionRecords;
use serde_json::json;

#[tokio::test]
async fn put_replaces_both_lists() {
    let store = Arc::new(MemoryStore::new().with_user(user("u1")));
    let body = json!({
        "artefacts_collected": ["a1", "a2"],
        "completed_quests": [{ "quest_id": "q1", "completed_at": accepted_at() }],
    });

    let response = put_json(build_test_app(store.clone()), "/api/v1/users/u1/collection", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let collection = store.get_collection("u1").await.unwrap();
    assert_eq!(collection.artefacts_collected, ["a1", "a2"]);
    assert_eq!(collection.completed_quests[0].quest_id, "q1");

    let json = body_json(get(build_test_app(store), "/api/v1/users/u1/collection").await).await;
    assert_eq!(json["data"]["artefacts_collected"], json!(["a1", "a2"]));
}

#[tokio::test]
async fn unknown_user_is_404() {
    let store = Arc::new(MemoryStore::new());
    let response = get(build_test_app(store.clone()), "/api/v1/users/ghost/collection").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = put_json(build_test_app(store), "/api/v1/users/ghost/collection", json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
