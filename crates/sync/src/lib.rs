//! Client-side synchronisation for the Curio quest engine.
//!
//! A [`Session`] is the context object of one signed-in visitor. It mutates
//! local quest state synchronously and persists every change in the
//! background through a [`SyncReconciler`], which retries once, honours
//! cancellation and tags every response so stale ones can be discarded.

pub mod config;
pub mod error;
pub mod http;
pub mod reconciler;
pub mod remote;
pub mod retry;
pub mod session;

pub use config::SyncConfig;
pub use error::SyncError;
pub use http::HttpRemote;
pub use reconciler::{SyncEvent, SyncEventKind, SyncReconciler};
pub use remote::{QuestSource, Remote};
pub use retry::RetryConfig;
pub use session::Session;
