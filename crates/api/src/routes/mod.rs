pub mod accounts;
pub mod artefacts;
pub mod health;
pub mod quests;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /quests                                  list (?available=true)
/// /quests/{id}                             get
/// /quests/{id}/leaderboard                 ranked read, idempotent append (POST)
///
/// /users/{user_id}/progress                list progress records
/// /users/{user_id}/progress/{quest_id}     get, patch, delete
/// /users/{user_id}/collection              get, full replace (PUT)
///
/// /accounts/{email}                        delete account + cascade
///
/// /artefacts/{artefact_id}/usage           quests referencing an artefact
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/quests", quests::router())
        .nest("/users", users::router())
        .nest("/accounts", accounts::router())
        .nest("/artefacts", artefacts::router())
}
