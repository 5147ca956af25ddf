//! Quest definitions as authored by the admin console.
//!
//! The engine treats a [`Quest`] as read-only input, with the single
//! exception of its leaderboard, which is rewritten by
//! [`crate::leaderboard`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::leaderboard::LeaderboardEntry;
use crate::types::{ArtefactId, QuestId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const QUEST_TYPE_SEQUENTIAL: &str = "sequential";
pub const QUEST_TYPE_OPEN: &str = "open";

/// All valid quest type strings.
pub const VALID_QUEST_TYPES: &[&str] = &[QUEST_TYPE_SEQUENTIAL, QUEST_TYPE_OPEN];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether the artefacts of a quest must be found in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    Sequential,
    Open,
}

impl QuestType {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            QUEST_TYPE_SEQUENTIAL => Ok(Self::Sequential),
            QUEST_TYPE_OPEN => Ok(Self::Open),
            _ => Err(CoreError::Validation(format!(
                "Invalid quest type '{s}'. Must be one of: {}",
                VALID_QUEST_TYPES.join(", ")
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => QUEST_TYPE_SEQUENTIAL,
            Self::Open => QUEST_TYPE_OPEN,
        }
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// An artefact as referenced from a quest, with its ordered hint list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtefactRef {
    pub artefact_id: ArtefactId,
    pub name: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

/// Inclusive window during which a quest can be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl DateRange {
    pub fn contains(&self, at: Timestamp) -> bool {
        self.from <= at && at <= self.to
    }
}

/// A quest definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub quest_id: QuestId,
    pub title: String,
    pub quest_type: QuestType,
    pub artefacts: Vec<ArtefactRef>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub prize: Option<String>,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl Quest {
    /// Whether the quest can be accepted at `now`. Quests without a date
    /// range are always available.
    pub fn is_available(&self, now: Timestamp) -> bool {
        self.date_range.map_or(true, |range| range.contains(now))
    }

    pub fn contains_artefact(&self, artefact_id: &str) -> bool {
        self.artefacts.iter().any(|a| a.artefact_id == artefact_id)
    }

    pub fn artefact(&self, artefact_id: &str) -> Option<&ArtefactRef> {
        self.artefacts.iter().find(|a| a.artefact_id == artefact_id)
    }

    /// The artefact expected at `index` in the authored order.
    pub fn artefact_at(&self, index: usize) -> Option<&ArtefactRef> {
        self.artefacts.get(index)
    }

    pub fn is_sequential(&self) -> bool {
        self.quest_type == QuestType::Sequential
    }
}

/// Validate an authored quest before it is stored.
///
/// Rejects quests without artefacts, duplicate artefact ids and inverted
/// date ranges; the progress invariants rely on all three.
pub fn validate_quest(quest: &Quest) -> Result<(), CoreError> {
    if quest.quest_id.trim().is_empty() {
        return Err(CoreError::Validation("quest_id must not be empty".into()));
    }
    if quest.artefacts.is_empty() {
        return Err(CoreError::Validation(format!(
            "Quest '{}' must reference at least one artefact",
            quest.quest_id
        )));
    }
    let mut seen = std::collections::BTreeSet::new();
    for artefact in &quest.artefacts {
        if !seen.insert(artefact.artefact_id.as_str()) {
            return Err(CoreError::Validation(format!(
                "Quest '{}' references artefact '{}' more than once",
                quest.quest_id, artefact.artefact_id
            )));
        }
    }
    if let Some(range) = quest.date_range {
        if range.from > range.to {
            return Err(CoreError::Validation(format!(
                "Quest '{}' has a date range that ends before it starts",
                quest.quest_id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

/// Build a quest with hint-less artefacts named after their ids.
#[cfg(test)]
pub(crate) fn test_quest(quest_id: &str, quest_type: QuestType, artefacts: &[&str]) -> Quest {
    Quest {
        quest_id: quest_id.to_string(),
        title: format!("Quest {quest_id}"),
        quest_type,
        artefacts: artefacts
            .iter()
            .map(|id| ArtefactRef {
                artefact_id: id.to_string(),
                name: id.to_string(),
                hints: Vec::new(),
            })
            .collect(),
        date_range: None,
        prize: None,
        leaderboard: Vec::new(),
    }
}
