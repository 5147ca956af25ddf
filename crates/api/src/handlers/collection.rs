//! Handlers for a user's collection of artefacts and completed quests.

use axum::extract::{Path, State};
use axum::Json;
use curio_core::collection::UserCollection;
use curio_core::store::CollectionRecords;
use curio_core::types::UserId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/{user_id}/collection
pub async fn get_collection(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<DataResponse<UserCollection>>> {
    let collection = state.store.get_collection(&user_id).await?;
    Ok(Json(DataResponse { data: collection }))
}

/// PUT /api/v1/users/{user_id}/collection
///
/// Full replace of both lists. Clients send their merged copy.
pub async fn replace_collection(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(collection): Json<UserCollection>,
) -> AppResult<Json<DataResponse<UserCollection>>> {
    state.store.put_collection(&user_id, &collection).await?;
    tracing::debug!(
        %user_id,
        artefacts = collection.artefacts_collected.len(),
        completed = collection.completed_quests.len(),
        "Collection replaced",
    );
    Ok(Json(DataResponse { data: collection }))
}
