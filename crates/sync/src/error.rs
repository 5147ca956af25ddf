use curio_core::error::CoreError;
use curio_core::store::StoreError;

/// Errors surfaced by [`crate::Session`] operations the caller awaits.
///
/// Background persistence never returns errors; failures there end up as
/// [`crate::SyncEventKind::Dropped`] events.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session was signed out while the request was in flight.
    #[error("Request cancelled")]
    Cancelled,
}
