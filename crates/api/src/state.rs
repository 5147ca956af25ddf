use std::sync::Arc;

use curio_core::store::Store;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Record store: PostgreSQL in production, in-memory otherwise.
    pub store: Arc<dyn Store>,
    /// Present only when running on PostgreSQL; used by the health check.
    pub pool: Option<curio_db::DbPool>,
    pub config: Arc<ServerConfig>,
}
