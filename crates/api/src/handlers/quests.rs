//! Handlers for the `/quests` resource and its nested leaderboard.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use curio_core::error::CoreError;
use curio_core::leaderboard::{self, AppendOutcome, LeaderboardEntry, RankedEntry};
use curio_core::quest::Quest;
use curio_core::store::{LeaderboardRecords, QuestRecords};
use curio_core::types::QuestId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for the quest listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListQuestsQuery {
    /// Only return quests whose date range contains the current time.
    #[serde(default)]
    pub available: bool,
}

/// GET /api/v1/quests
pub async fn list_quests(
    State(state): State<AppState>,
    Query(params): Query<ListQuestsQuery>,
) -> AppResult<Json<DataResponse<Vec<Quest>>>> {
    let mut quests = state.store.list_quests().await?;
    if params.available {
        let now = Utc::now();
        quests.retain(|quest| quest.is_available(now));
    }
    Ok(Json(DataResponse { data: quests }))
}

/// GET /api/v1/quests/{id}
pub async fn get_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<QuestId>,
) -> AppResult<Json<DataResponse<Quest>>> {
    let quest = find_quest(&state, &quest_id).await?;
    Ok(Json(DataResponse { data: quest }))
}

/// GET /api/v1/quests/{id}/leaderboard
///
/// Entries sorted by time taken with 1-based ranks; entries without a valid
/// time are listed last and unranked.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(quest_id): Path<QuestId>,
) -> AppResult<Json<DataResponse<Vec<RankedEntry>>>> {
    let quest = find_quest(&state, &quest_id).await?;
    Ok(Json(DataResponse {
        data: leaderboard::ranked(&quest.leaderboard),
    }))
}

/// POST /api/v1/quests/{id}/leaderboard
///
/// Append the caller's completion. Returns 201 when the entry was written
/// and 200 when the user was already on the board.
pub async fn append_leaderboard_entry(
    State(state): State<AppState>,
    Path(quest_id): Path<QuestId>,
    Json(entry): Json<LeaderboardEntry>,
) -> AppResult<(StatusCode, Json<DataResponse<AppendOutcome>>)> {
    if entry.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id must not be empty".into()));
    }

    let outcome = state.store.append_entry(&quest_id, &entry).await?;
    let status = match outcome {
        AppendOutcome::Appended => StatusCode::CREATED,
        AppendOutcome::AlreadyPresent => StatusCode::OK,
    };
    Ok((status, Json(DataResponse { data: outcome })))
}

// ── Private helpers ──────────────────────────────────────────────────────

pub(crate) async fn find_quest(state: &AppState, quest_id: &str) -> AppResult<Quest> {
    state
        .store
        .get_quest(quest_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Quest",
                id: quest_id.to_string(),
            })
        })
}
