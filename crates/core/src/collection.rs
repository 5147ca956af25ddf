//! A visitor's lifetime collection of artefacts and completed quests.
//!
//! Both lists only grow. The remote endpoint replaces them wholesale, so
//! every update sends the complete merged lists.

use serde::{Deserialize, Serialize};

use crate::progress::Completion;
use crate::types::{ArtefactId, QuestId, Timestamp, UserId};

/// A quest the visitor has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedQuest {
    pub quest_id: QuestId,
    pub completed_at: Timestamp,
    #[serde(default)]
    pub prize: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCollection {
    #[serde(default)]
    pub artefacts_collected: Vec<ArtefactId>,
    /// One entry per quest id.
    #[serde(default)]
    pub completed_quests: Vec<CompletedQuest>,
}

impl UserCollection {
    /// Add an artefact. Returns `false` if it was already collected.
    pub fn collect_artefact(&mut self, artefact_id: &str) -> bool {
        if self.artefacts_collected.iter().any(|id| id == artefact_id) {
            return false;
        }
        self.artefacts_collected.push(artefact_id.to_string());
        true
    }

    /// Record a finished quest. The first completion of a quest is kept.
    pub fn record_completion(&mut self, completion: &Completion) -> bool {
        if self.has_completed(&completion.quest_id) {
            return false;
        }
        self.completed_quests.push(CompletedQuest {
            quest_id: completion.quest_id.clone(),
            completed_at: completion.completed_at,
            prize: completion.prize.clone(),
        });
        true
    }

    pub fn has_completed(&self, quest_id: &str) -> bool {
        self.completed_quests.iter().any(|c| c.quest_id == quest_id)
    }

    /// Union with another copy of the collection, keeping local order first.
    pub fn merge(&mut self, other: &UserCollection) -> bool {
        let mut changed = false;
        for artefact_id in &other.artefacts_collected {
            changed |= self.collect_artefact(artefact_id);
        }
        for completed in &other.completed_quests {
            if !self.has_completed(&completed.quest_id) {
                self.completed_quests.push(completed.clone());
                changed = true;
            }
        }
        changed
    }
}

/// A registered visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub collection: UserCollection,
}
