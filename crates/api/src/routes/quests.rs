//! Route definitions for the `/quests` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::quests;
use crate::state::AppState;

/// Routes mounted at `/quests`.
///
/// ```text
/// GET    /                     -> list_quests (?available=true)
/// GET    /{id}                 -> get_quest
/// GET    /{id}/leaderboard     -> get_leaderboard
/// POST   /{id}/leaderboard     -> append_leaderboard_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(quests::list_quests))
        .route("/{id}", get(quests::get_quest))
        .route(
            "/{id}/leaderboard",
            get(quests::get_leaderboard).post(quests::append_leaderboard_entry),
        )
}
