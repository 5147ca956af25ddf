//! Route definitions for per-user records.

use axum::routing::get;
use axum::Router;

use crate::handlers::{collection, progress};
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /{user_id}/progress               -> list_progress
/// GET    /{user_id}/progress/{quest_id}    -> get_progress
/// PATCH  /{user_id}/progress/{quest_id}    -> patch_progress
/// DELETE /{user_id}/progress/{quest_id}    -> delete_progress
/// GET    /{user_id}/collection             -> get_collection
/// PUT    /{user_id}/collection             -> replace_collection
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}/progress", get(progress::list_progress))
        .route(
            "/{user_id}/progress/{quest_id}",
            get(progress::get_progress)
                .patch(progress::patch_progress)
                .delete(progress::delete_progress),
        )
        .route(
            "/{user_id}/collection",
            get(collection::get_collection).put(collection::replace_collection),
        )
}
