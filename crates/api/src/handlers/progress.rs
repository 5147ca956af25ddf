//! Handlers for per-user quest progress records.
//!
//! Records are written through partial patches only; the merge rules live
//! in `curio_core::merge` and are applied by the store.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use curio_core::error::CoreError;
use curio_core::merge::ProgressPatch;
use curio_core::progress::QuestProgress;
use curio_core::store::ProgressRecords;
use curio_core::types::{QuestId, UserId};

use crate::error::{AppError, AppResult};
use crate::handlers::quests::find_quest;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/{user_id}/progress
pub async fn list_progress(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<DataResponse<Vec<QuestProgress>>>> {
    let records = state.store.list_progress(&user_id).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/users/{user_id}/progress/{quest_id}
pub async fn get_progress(
    State(state): State<AppState>,
    Path((user_id, quest_id)): Path<(UserId, QuestId)>,
) -> AppResult<Json<DataResponse<QuestProgress>>> {
    let record = state
        .store
        .get_progress(&user_id, &quest_id)
        .await?
        .ok_or_else(|| progress_not_found(&user_id, &quest_id))?;
    Ok(Json(DataResponse { data: record }))
}

/// PATCH /api/v1/users/{user_id}/progress/{quest_id}
///
/// Apply a partial update, creating the record if absent. The quest must
/// exist and the submission log in the patch must be valid for it.
pub async fn patch_progress(
    State(state): State<AppState>,
    Path((user_id, quest_id)): Path<(UserId, QuestId)>,
    Json(patch): Json<ProgressPatch>,
) -> AppResult<Json<DataResponse<QuestProgress>>> {
    let quest = find_quest(&state, &quest_id).await?;
    patch.validate_for(&quest)?;

    let record = state
        .store
        .patch_progress(&user_id, &quest_id, &patch)
        .await?;
    tracing::debug!(
        %user_id,
        %quest_id,
        submitted = record.submitted_artefact_ids.len(),
        completed = record.is_completed(),
        "Progress patched",
    );
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /api/v1/users/{user_id}/progress/{quest_id}
///
/// Used when a visitor cancels a quest. Returns 404 if there was no record.
pub async fn delete_progress(
    State(state): State<AppState>,
    Path((user_id, quest_id)): Path<(UserId, QuestId)>,
) -> AppResult<StatusCode> {
    if state.store.delete_progress(&user_id, &quest_id).await? {
        tracing::info!(%user_id, %quest_id, "Progress record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(progress_not_found(&user_id, &quest_id))
    }
}

fn progress_not_found(user_id: &str, quest_id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "QuestProgress",
        id: format!("{user_id}/{quest_id}"),
    })
}
