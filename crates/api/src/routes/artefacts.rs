use axum::routing::get;
use axum::Router;

use crate::handlers::artefacts;
use crate::state::AppState;

/// Routes mounted at `/artefacts`.
///
/// ```text
/// GET    /{artefact_id}/usage    -> artefact_usage
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{artefact_id}/usage", get(artefacts::artefact_usage))
}
