//! In-process implementation of every store trait.
//!
//! Used by unit tests, the API integration tests and database-less local
//! runs. Failure injection and call counters let tests exercise the retry
//! and cascade paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    CollectionRecords, LeaderboardRecords, ProgressRecords, QuestRecords, StoreError, UserRecords,
};
use crate::collection::{User, UserCollection};
use crate::leaderboard::{self, AppendOutcome, LeaderboardEntry};
use crate::merge::ProgressPatch;
use crate::progress::QuestProgress;
use crate::quest::Quest;
use crate::types::{QuestId, UserId};

#[derive(Debug, Default)]
struct Records {
    quests: BTreeMap<QuestId, Quest>,
    users: BTreeMap<UserId, User>,
    progress: BTreeMap<(UserId, QuestId), QuestProgress>,
}

#[derive(Debug, Default)]
struct Faults {
    leaderboard_writes: BTreeSet<QuestId>,
    leaderboard_write_counts: BTreeMap<QuestId, usize>,
    patch_delay: Option<Duration>,
}

/// Store backed by in-memory maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
    faults: Mutex<Faults>,
    unavailable: AtomicBool,
    failing_patches: AtomicU32,
    patch_calls: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quest(self, quest: Quest) -> Self {
        lock(&self.records).quests.insert(quest.quest_id.clone(), quest);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        lock(&self.records).users.insert(user.user_id.clone(), user);
        self
    }

    /// Replace or insert a quest definition.
    pub fn insert_quest(&self, quest: Quest) {
        lock(&self.records).quests.insert(quest.quest_id.clone(), quest);
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `count` progress patches fail.
    pub fn fail_next_patches(&self, count: u32) {
        self.failing_patches.store(count, Ordering::SeqCst);
    }

    /// Make every leaderboard write for `quest_id` fail.
    pub fn fail_leaderboard_writes(&self, quest_id: &str) {
        lock(&self.faults).leaderboard_writes.insert(quest_id.to_string());
    }

    /// Delay every progress patch, to hold requests in flight.
    pub fn delay_patches(&self, delay: Duration) {
        lock(&self.faults).patch_delay = Some(delay);
    }

    /// Number of patch requests received, including failed ones.
    pub fn patch_calls(&self) -> u32 {
        self.patch_calls.load(Ordering::SeqCst)
    }

    /// Number of successful leaderboard writes for `quest_id`.
    pub fn leaderboard_writes(&self, quest_id: &str) -> usize {
        lock(&self.faults)
            .leaderboard_write_counts
            .get(quest_id)
            .copied()
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn take_patch_failure(&self) -> bool {
        self.failing_patches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl QuestRecords for MemoryStore {
    async fn list_quests(&self) -> Result<Vec<Quest>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.records).quests.values().cloned().collect())
    }

    async fn get_quest(&self, quest_id: &str) -> Result<Option<Quest>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.records).quests.get(quest_id).cloned())
    }

    async fn put_leaderboard(
        &self,
        quest_id: &str,
        entries: &[LeaderboardEntry],
    ) -> Result<(), StoreError> {
        self.check_available()?;
        if lock(&self.faults).leaderboard_writes.contains(quest_id) {
            return Err(StoreError::Backend(format!(
                "simulated write failure for quest {quest_id}"
            )));
        }

        let mut records = lock(&self.records);
        let quest = records
            .quests
            .get_mut(quest_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Quest",
                id: quest_id.to_string(),
            })?;
        quest.leaderboard = entries.to_vec();
        drop(records);

        *lock(&self.faults)
            .leaderboard_write_counts
            .entry(quest_id.to_string())
            .or_insert(0) += 1;
        Ok(())
    }
}

#[async_trait]
impl LeaderboardRecords for MemoryStore {
    async fn append_entry(
        &self,
        quest_id: &str,
        entry: &LeaderboardEntry,
    ) -> Result<AppendOutcome, StoreError> {
        leaderboard::append_on_complete(self, quest_id, entry).await
    }
}

#[async_trait]
impl ProgressRecords for MemoryStore {
    async fn get_progress(
        &self,
        user_id: &str,
        quest_id: &str,
    ) -> Result<Option<QuestProgress>, StoreError> {
        self.check_available()?;
        let key = (user_id.to_string(), quest_id.to_string());
        Ok(lock(&self.records).progress.get(&key).cloned())
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<QuestProgress>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.records)
            .progress
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, progress)| progress.clone())
            .collect())
    }

    async fn patch_progress(
        &self,
        user_id: &str,
        quest_id: &str,
        patch: &ProgressPatch,
    ) -> Result<QuestProgress, StoreError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = lock(&self.faults).patch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        if self.take_patch_failure() {
            return Err(StoreError::Unavailable("simulated patch failure".into()));
        }

        let key = (user_id.to_string(), quest_id.to_string());
        let mut records = lock(&self.records);
        let existing = records.progress.remove(&key);
        let updated = patch.apply(&key.1, existing);
        records.progress.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete_progress(&self, user_id: &str, quest_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let key = (user_id.to_string(), quest_id.to_string());
        Ok(lock(&self.records).progress.remove(&key).is_some())
    }
}

#[async_trait]
impl UserRecords for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.records)
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(lock(&self.records).users.remove(user_id).is_some())
    }
}

#[async_trait]
impl CollectionRecords for MemoryStore {
    async fn get_collection(&self, user_id: &str) -> Result<UserCollection, StoreError> {
        self.check_available()?;
        lock(&self.records)
            .users
            .get(user_id)
            .map(|user| user.collection.clone())
            .ok_or_else(|| StoreError::NotFound {
                entity: "User",
                id: user_id.to_string(),
            })
    }

    async fn put_collection(
        &self,
        user_id: &str,
        collection: &UserCollection,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut records = lock(&self.records);
        let user = records
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "User",
                id: user_id.to_string(),
            })?;
        user.collection = collection.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn injected_patch_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_patches(1);
        let patch = ProgressPatch::new(Utc::now());

        assert!(store.patch_progress("u", "q", &patch).await.is_err());
        assert!(store.patch_progress("u", "q", &patch).await.is_ok());
        assert_eq!(store.patch_calls(), 2);
    }

    #[tokio::test]
    async fn unavailable_store_fails_everything() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.list_quests().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn collection_requires_existing_user() {
        let store = MemoryStore::new();
        let err = store.get_collection("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "User", .. }));
        assert!(!err.is_transient());
    }
}
