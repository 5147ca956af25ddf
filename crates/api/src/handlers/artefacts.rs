//! Artefact reference checks.

use axum::extract::{Path, State};
use axum::Json;
use curio_core::cascade;
use curio_core::types::{ArtefactId, QuestId};
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Quests that still reference an artefact.
#[derive(Debug, Serialize)]
pub struct ArtefactUsage {
    pub artefact_id: ArtefactId,
    pub quest_ids: Vec<QuestId>,
    pub in_use: bool,
}

/// GET /api/v1/artefacts/{artefact_id}/usage
///
/// Checked before an artefact is removed. The result is a point-in-time
/// scan; a quest saved afterwards is not reflected.
pub async fn artefact_usage(
    State(state): State<AppState>,
    Path(artefact_id): Path<ArtefactId>,
) -> AppResult<Json<DataResponse<ArtefactUsage>>> {
    let quest_ids = cascade::quests_using_artefact(state.store.as_ref(), &artefact_id).await?;
    Ok(Json(DataResponse {
        data: ArtefactUsage {
            in_use: !quest_ids.is_empty(),
            artefact_id,
            quest_ids,
        },
    }))
}
