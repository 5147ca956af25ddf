//! Account deletion.

use axum::extract::{Path, State};
use axum::Json;
use curio_core::cascade::{self, AccountDeletionSummary};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// DELETE /api/v1/accounts/{email}
///
/// Removes the user from every leaderboard, deletes their progress records
/// and then the user record. Leaderboard failures do not stop the deletion;
/// they are reported in the summary (`total`, `successful`, `failed`).
pub async fn delete_account(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<DataResponse<AccountDeletionSummary>>> {
    let summary = cascade::delete_account(state.store.as_ref(), &email).await?;
    if summary.leaderboards.failed > 0 || summary.scan_error.is_some() {
        tracing::warn!(
            user_id = %summary.user_id,
            failed = summary.leaderboards.failed,
            scan_error = ?summary.scan_error,
            "Account deleted with incomplete leaderboard cleanup",
        );
    }
    Ok(Json(DataResponse { data: summary }))
}
