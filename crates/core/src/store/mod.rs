//! Persistence seams of the engine.
//!
//! The remote store is a per-record key-value service without
//! multi-record transactions. Each trait covers one record family; [`Store`]
//! bundles all of them for server-side callers.
//!
//! Implementations:
//! - [`memory::MemoryStore`] — in-process store used by tests and local runs.
//! - `curio_db::PgStore` — PostgreSQL.
//! - `curio_sync::HttpRemote` — the client-side view over the HTTP API.

pub mod memory;

use async_trait::async_trait;

use crate::collection::{User, UserCollection};
use crate::leaderboard::{AppendOutcome, LeaderboardEntry};
use crate::merge::ProgressPatch;
use crate::progress::QuestProgress;
use crate::quest::Quest;

/// Errors raised by store implementations.
///
/// `Unavailable` and `Backend` are transient sync failures: background
/// callers retry them once, then log them. `NotFound` and `Rejected` are
/// final.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The remote refused the request as invalid; sending it again cannot
    /// succeed.
    #[error("Request rejected by store: {0}")]
    Rejected(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Backend(_))
    }
}

/// Quest definitions and their nested leaderboards.
#[async_trait]
pub trait QuestRecords: Send + Sync {
    /// Full scan of all quests.
    async fn list_quests(&self) -> Result<Vec<Quest>, StoreError>;

    async fn get_quest(&self, quest_id: &str) -> Result<Option<Quest>, StoreError>;

    /// Overwrite the leaderboard list of one quest.
    async fn put_leaderboard(
        &self,
        quest_id: &str,
        entries: &[LeaderboardEntry],
    ) -> Result<(), StoreError>;
}

/// Idempotent leaderboard append, as exposed to clients.
#[async_trait]
pub trait LeaderboardRecords: Send + Sync {
    async fn append_entry(
        &self,
        quest_id: &str,
        entry: &LeaderboardEntry,
    ) -> Result<AppendOutcome, StoreError>;
}

/// Progress records keyed by `(user_id, quest_id)`.
#[async_trait]
pub trait ProgressRecords: Send + Sync {
    async fn get_progress(
        &self,
        user_id: &str,
        quest_id: &str,
    ) -> Result<Option<QuestProgress>, StoreError>;

    async fn list_progress(&self, user_id: &str) -> Result<Vec<QuestProgress>, StoreError>;

    /// Apply a partial update, creating the record if absent. Returns the
    /// stored record after the update.
    async fn patch_progress(
        &self,
        user_id: &str,
        quest_id: &str,
        patch: &ProgressPatch,
    ) -> Result<QuestProgress, StoreError>;

    /// Returns `false` if there was no record to delete.
    async fn delete_progress(&self, user_id: &str, quest_id: &str) -> Result<bool, StoreError>;
}

/// User records, resolved by email for account deletion.
#[async_trait]
pub trait UserRecords: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Returns `false` if the user did not exist.
    async fn delete_user(&self, user_id: &str) -> Result<bool, StoreError>;
}

/// The collection lists nested in a user record.
#[async_trait]
pub trait CollectionRecords: Send + Sync {
    /// Fails with `NotFound` when the user does not exist.
    async fn get_collection(&self, user_id: &str) -> Result<UserCollection, StoreError>;

    /// Replace both collection lists of a user.
    async fn put_collection(
        &self,
        user_id: &str,
        collection: &UserCollection,
    ) -> Result<(), StoreError>;
}

/// Every record family; implemented automatically.
pub trait Store:
    QuestRecords + LeaderboardRecords + ProgressRecords + UserRecords + CollectionRecords
{
}

impl<T> Store for T where
    T: QuestRecords + LeaderboardRecords + ProgressRecords + UserRecords + CollectionRecords
{
}
