//! What a client session needs from the remote store.

use async_trait::async_trait;
use curio_core::quest::Quest;
use curio_core::store::memory::MemoryStore;
use curio_core::store::{
    CollectionRecords, LeaderboardRecords, ProgressRecords, QuestRecords, StoreError,
};

/// Read access to quest definitions.
#[async_trait]
pub trait QuestSource: Send + Sync {
    async fn fetch_quest(&self, quest_id: &str) -> Result<Option<Quest>, StoreError>;
}

/// Every record family a session reads or writes; implemented automatically.
pub trait Remote:
    QuestSource + ProgressRecords + LeaderboardRecords + CollectionRecords + 'static
{
}

impl<T> Remote for T where
    T: QuestSource + ProgressRecords + LeaderboardRecords + CollectionRecords + 'static
{
}

#[async_trait]
impl QuestSource for MemoryStore {
    async fn fetch_quest(&self, quest_id: &str) -> Result<Option<Quest>, StoreError> {
        self.get_quest(quest_id).await
    }
}
