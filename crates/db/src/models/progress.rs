//! Quest progress rows.

use std::collections::{BTreeMap, BTreeSet};

use curio_core::progress::QuestProgress;
use curio_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `quest_progress` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub user_id: String,
    pub quest_id: String,
    pub accepted_at: Timestamp,
    pub submitted_artefact_ids: Json<Vec<String>>,
    pub attempts: Json<BTreeMap<String, u32>>,
    pub displayed_hints: Json<BTreeSet<String>>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl From<ProgressRow> for QuestProgress {
    fn from(row: ProgressRow) -> Self {
        QuestProgress {
            quest_id: row.quest_id,
            accepted_at: row.accepted_at,
            submitted_artefact_ids: row.submitted_artefact_ids.0,
            attempts: row.attempts.0,
            displayed_hints: row.displayed_hints.0,
            completed_at: row.completed_at,
        }
    }
}
