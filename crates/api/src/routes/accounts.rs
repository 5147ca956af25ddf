use axum::routing::delete;
use axum::Router;

use crate::handlers::accounts;
use crate::state::AppState;

/// Routes mounted at `/accounts`.
///
/// ```text
/// DELETE /{email}    -> delete_account
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{email}", delete(accounts::delete_account))
}
