//! HTTP-level tests for quest reads and leaderboard appends.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, build_test_app, get, post_json, quest, with_board};
use curio_core::quest::{DateRange, QuestType};
use curio_core::store::memory::MemoryStore;
use curio_core::store::QuestRecords;
use serde_json::json;

fn store() -> Arc<MemoryStore> {
    let mut expired = quest("q-old", QuestType::Open, &["x"]);
    expired.date_range = Some(DateRange {
        from: Utc::now() - Duration::days(30),
        to: Utc::now() - Duration::days(1),
    });
    Arc::new(
        MemoryStore::new()
            .with_quest(with_board(
                quest("q1", QuestType::Sequential, &["a1", "a2", "a3"]),
                &[("slow", 900), ("fast", 120)],
            ))
            .with_quest(expired),
    )
}

// ---------------------------------------------------------------------------
// Quest reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lists_all_quests() {
    let app = build_test_app(store());
    let response = get(app, "/api/v1/quests").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn available_filter_hides_expired_quests() {
    let app = build_test_app(store());
    let json = body_json(get(app, "/api/v1/quests?available=true").await).await;
    let ids: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["quest_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["q1"]);
}

#[tokio::test]
async fn get_quest_returns_artefacts_in_order() {
    let app = build_test_app(store());
    let json = body_json(get(app, "/api/v1/quests/q1").await).await;
    assert_eq!(json["data"]["quest_type"], "sequential");
    assert_eq!(json["data"]["artefacts"][2]["artefact_id"], "a3");
}

#[tokio::test]
async fn unknown_quest_is_404_with_error_body() {
    let app = build_test_app(store());
    let response = get(app, "/api/v1/quests/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(json["error"].as_str().unwrap().contains("missing"));
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leaderboard_is_ranked_by_time() {
    let app = build_test_app(store());
    let json = body_json(get(app, "/api/v1/quests/q1/leaderboard").await).await;
    let board = json["data"].as_array().unwrap();
    assert_eq!(board[0]["user_id"], "fast");
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["user_id"], "slow");
    assert_eq!(board[1]["rank"], 2);
}

#[tokio::test]
async fn append_is_idempotent_per_user() {
    let store = store();
    let entry = json!({ "user_id": "newbie", "time_taken": 300 });

    let first = post_json(build_test_app(store.clone()), "/api/v1/quests/q1/leaderboard", entry.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(body_json(first).await["data"], "appended");

    let retry = json!({ "user_id": "newbie", "time_taken": 100 });
    let second = post_json(build_test_app(store.clone()), "/api/v1/quests/q1/leaderboard", retry).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["data"], "already_present");

    let quest = store.get_quest("q1").await.unwrap().unwrap();
    let entries: Vec<_> = quest.leaderboard.iter().filter(|e| e.user_id == "newbie").collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].time_taken, Some(300));
    assert_eq!(quest.leaderboard[1].user_id, "newbie");
}

#[tokio::test]
async fn append_to_unknown_quest_is_404() {
    let app = build_test_app(store());
    let response = post_json(app, "/api/v1/quests/missing/leaderboard", json!({ "user_id": "u" })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn append_requires_a_user_id() {
    let app = build_test_app(store());
    let response = post_json(app, "/api/v1/quests/q1/leaderboard", json!({ "user_id": " " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unavailable_store_is_503() {
    let store = store();
    store.set_unavailable(true);
    let response = get(build_test_app(store), "/api/v1/quests").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "STORE_UNAVAILABLE");
}
