//! Repository for the `quests` table.

use curio_core::leaderboard::LeaderboardEntry;
use curio_core::quest::Quest;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::quest::QuestRow;

/// Column list shared across queries.
const COLUMNS: &str = "quest_id, title, quest_type, artefacts, date_from, date_to, \
                       prize, leaderboard, created_at, updated_at";

/// Provides reads of quest definitions and leaderboard rewrites.
pub struct QuestRepo;

impl QuestRepo {
    /// Insert or replace a quest definition, leaderboard included.
    pub async fn upsert(pool: &PgPool, quest: &Quest) -> Result<QuestRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO quests (quest_id, title, quest_type, artefacts, date_from, date_to, prize, leaderboard) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (quest_id) DO UPDATE SET \
                title = EXCLUDED.title, \
                quest_type = EXCLUDED.quest_type, \
                artefacts = EXCLUDED.artefacts, \
                date_from = EXCLUDED.date_from, \
                date_to = EXCLUDED.date_to, \
                prize = EXCLUDED.prize, \
                leaderboard = EXCLUDED.leaderboard, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestRow>(&query)
            .bind(&quest.quest_id)
            .bind(&quest.title)
            .bind(quest.quest_type.as_str())
            .bind(Json(&quest.artefacts))
            .bind(quest.date_range.map(|r| r.from))
            .bind(quest.date_range.map(|r| r.to))
            .bind(&quest.prize)
            .bind(Json(&quest.leaderboard))
            .fetch_one(pool)
            .await
    }

    /// Find a quest by id.
    pub async fn find_by_id(pool: &PgPool, quest_id: &str) -> Result<Option<QuestRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quests WHERE quest_id = $1");
        sqlx::query_as::<_, QuestRow>(&query)
            .bind(quest_id)
            .fetch_optional(pool)
            .await
    }

    /// Scan every quest, ordered by id.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<QuestRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quests ORDER BY quest_id");
        sqlx::query_as::<_, QuestRow>(&query).fetch_all(pool).await
    }

    /// Overwrite the leaderboard of one quest.
    ///
    /// Returns `false` if the quest does not exist.
    pub async fn update_leaderboard(
        pool: &PgPool,
        quest_id: &str,
        entries: &[LeaderboardEntry],
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE quests SET leaderboard = $2, updated_at = now() WHERE quest_id = $1",
        )
        .bind(quest_id)
        .bind(Json(entries))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
