//! [`PgStore`]: the store traits over PostgreSQL.

use async_trait::async_trait;
use curio_core::collection::{User, UserCollection};
use curio_core::leaderboard::{self, AppendOutcome, LeaderboardEntry};
use curio_core::merge::ProgressPatch;
use curio_core::progress::QuestProgress;
use curio_core::quest::Quest;
use curio_core::store::{
    CollectionRecords, LeaderboardRecords, ProgressRecords, QuestRecords, StoreError, UserRecords,
};

use crate::models::quest::QuestRow;
use crate::repositories::{ProgressRepo, QuestRepo, UserRepo};
use crate::DbPool;

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map a sqlx error onto the store taxonomy.
///
/// Connection-level failures are transient; everything else is a backend
/// error that is still worth one retry.
fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            StoreError::Backend(other.to_string())
        }
    }
}

fn quest_from_row(row: QuestRow) -> Result<Quest, StoreError> {
    Quest::try_from(row).map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl QuestRecords for PgStore {
    async fn list_quests(&self) -> Result<Vec<Quest>, StoreError> {
        QuestRepo::list_all(&self.pool)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(quest_from_row)
            .collect()
    }

    async fn get_quest(&self, quest_id: &str) -> Result<Option<Quest>, StoreError> {
        QuestRepo::find_by_id(&self.pool, quest_id)
            .await
            .map_err(store_error)?
            .map(quest_from_row)
            .transpose()
    }

    async fn put_leaderboard(
        &self,
        quest_id: &str,
        entries: &[LeaderboardEntry],
    ) -> Result<(), StoreError> {
        let updated = QuestRepo::update_leaderboard(&self.pool, quest_id, entries)
            .await
            .map_err(store_error)?;
        if !updated {
            return Err(StoreError::NotFound {
                entity: "Quest",
                id: quest_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LeaderboardRecords for PgStore {
    async fn append_entry(
        &self,
        quest_id: &str,
        entry: &LeaderboardEntry,
    ) -> Result<AppendOutcome, StoreError> {
        leaderboard::append_on_complete(self, quest_id, entry).await
    }
}

#[async_trait]
impl ProgressRecords for PgStore {
    async fn get_progress(
        &self,
        user_id: &str,
        quest_id: &str,
    ) -> Result<Option<QuestProgress>, StoreError> {
        Ok(ProgressRepo::find(&self.pool, user_id, quest_id)
            .await
            .map_err(store_error)?
            .map(QuestProgress::from))
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<QuestProgress>, StoreError> {
        Ok(ProgressRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(QuestProgress::from)
            .collect())
    }

    async fn patch_progress(
        &self,
        user_id: &str,
        quest_id: &str,
        patch: &ProgressPatch,
    ) -> Result<QuestProgress, StoreError> {
        ProgressRepo::apply_patch(&self.pool, user_id, quest_id, patch)
            .await
            .map(QuestProgress::from)
            .map_err(store_error)
    }

    async fn delete_progress(&self, user_id: &str, quest_id: &str) -> Result<bool, StoreError> {
        ProgressRepo::delete(&self.pool, user_id, quest_id)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl UserRecords for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email)
            .await
            .map_err(store_error)?
            .map(User::from))
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, StoreError> {
        UserRepo::delete(&self.pool, user_id).await.map_err(store_error)
    }
}

#[async_trait]
impl CollectionRecords for PgStore {
    async fn get_collection(&self, user_id: &str) -> Result<UserCollection, StoreError> {
        UserRepo::find_by_id(&self.pool, user_id)
            .await
            .map_err(store_error)?
            .map(|row| User::from(row).collection)
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
        let updated = UserRepo::replace_collection(&self.pool, user_id, collection)
            .await
            .map_err(store_error)?;
        if !updated {
            return Err(StoreError::NotFound {
                entity: "User",
                id: user_id.to_string(),
            });
        }
        Ok(())
    }
}
