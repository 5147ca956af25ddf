//! Repository for the `quest_progress` table.

use curio_core::merge::ProgressPatch;
use curio_core::progress::QuestProgress;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::progress::ProgressRow;

/// Column list shared across queries.
const COLUMNS: &str = "user_id, quest_id, accepted_at, submitted_artefact_ids, attempts, \
                       displayed_hints, completed_at, updated_at";

/// Provides point reads and partial updates of progress records.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Find the progress of `user_id` on `quest_id`.
    pub async fn find(
        pool: &PgPool,
        user_id: &str,
        quest_id: &str,
    ) -> Result<Option<ProgressRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quest_progress WHERE user_id = $1 AND quest_id = $2");
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .bind(quest_id)
            .fetch_optional(pool)
            .await
    }

    /// List every progress record of a user, most recently accepted first.
    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<ProgressRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quest_progress WHERE user_id = $1 ORDER BY accepted_at DESC"
        );
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update to one record, creating it if absent.
    ///
    /// The record is locked for the read-merge-write so that concurrent
    /// patches of the same record cannot lose attempts, hint keys or
    /// submissions. The submission log is only ever extended. Only
    /// this single row takes part in the transaction.
    pub async fn apply_patch(
        pool: &PgPool,
        user_id: &str,
        quest_id: &str,
        patch: &ProgressPatch,
    ) -> Result<ProgressRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!(
            "SELECT {COLUMNS} FROM quest_progress WHERE user_id = $1 AND quest_id = $2 FOR UPDATE"
        );
        let existing = sqlx::query_as::<_, ProgressRow>(&select)
            .bind(user_id)
            .bind(quest_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(QuestProgress::from);

        let quest_id_owned = quest_id.to_string();
        let merged = patch.apply(&quest_id_owned, existing);

        let upsert = format!(
            "INSERT INTO quest_progress \
                (user_id, quest_id, accepted_at, submitted_artefact_ids, attempts, displayed_hints, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id, quest_id) DO UPDATE SET \
                submitted_artefact_ids = EXCLUDED.submitted_artefact_ids, \
                attempts = EXCLUDED.attempts, \
                displayed_hints = EXCLUDED.displayed_hints, \
                completed_at = EXCLUDED.completed_at, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProgressRow>(&upsert)
            .bind(user_id)
            .bind(quest_id)
            .bind(merged.accepted_at)
            .bind(Json(&merged.submitted_artefact_ids))
            .bind(Json(&merged.attempts))
            .bind(Json(&merged.displayed_hints))
            .bind(merged.completed_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Delete one record. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, user_id: &str, quest_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM quest_progress WHERE user_id = $1 AND quest_id = $2")
            .bind(user_id)
            .bind(quest_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
