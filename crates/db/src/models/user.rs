//! User rows.

use curio_core::collection::{CompletedQuest, User, UserCollection};
use curio_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: String,
    pub email: String,
    pub artefacts_collected: Json<Vec<String>>,
    pub completed_quests: Json<Vec<CompletedQuest>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            email: row.email,
            collection: UserCollection {
                artefacts_collected: row.artefacts_collected.0,
                completed_quests: row.completed_quests.0,
            },
        }
    }
}
