//! Quest rows.

use curio_core::error::CoreError;
use curio_core::leaderboard::LeaderboardEntry;
use curio_core::quest::{ArtefactRef, DateRange, Quest, QuestType};
use curio_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `quests` table.
#[derive(Debug, Clone, FromRow)]
pub struct QuestRow {
    pub quest_id: String,
    pub title: String,
    pub quest_type: String,
    pub artefacts: Json<Vec<ArtefactRef>>,
    pub date_from: Option<Timestamp>,
    pub date_to: Option<Timestamp>,
    pub prize: Option<String>,
    pub leaderboard: Json<Vec<LeaderboardEntry>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<QuestRow> for Quest {
    type Error = CoreError;

    fn try_from(row: QuestRow) -> Result<Self, Self::Error> {
        // A half-open range in the table is treated as no gating at all.
        let date_range = match (row.date_from, row.date_to) {
            (Some(from), Some(to)) => Some(DateRange { from, to }),
            _ => None,
        };
        Ok(Quest {
            quest_id: row.quest_id,
            title: row.title,
            quest_type: QuestType::from_str_value(&row.quest_type)?,
            artefacts: row.artefacts.0,
            date_range,
            prize: row.prize,
            leaderboard: row.leaderboard.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn row(quest_type: &str) -> QuestRow {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        QuestRow {
            quest_id: "q1".into(),
            title: "Roman coins".into(),
            quest_type: quest_type.into(),
            artefacts: Json(vec![ArtefactRef {
                artefact_id: "a".into(),
                name: "Denarius".into(),
                hints: vec!["Case 4".into()],
            }]),
            date_from: Some(now),
            date_to: None,
            prize: Some("Badge".into()),
            leaderboard: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn converts_row_and_ignores_half_open_range() {
        let quest = Quest::try_from(row("sequential")).unwrap();
        assert_eq!(quest.quest_type, QuestType::Sequential);
        assert!(quest.date_range.is_none());
        assert_eq!(quest.artefacts[0].hints, ["Case 4"]);
    }

    #[test]
    fn unknown_quest_type_is_rejected() {
        assert!(Quest::try_from(row("scavenger")).is_err());
    }
}
