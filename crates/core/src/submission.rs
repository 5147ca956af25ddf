//! Submission decisions.
//!
//! [`decide`] is a pure function of the current progress and the quest
//! definition. Completion is derived from counts alone so that a sequence
//! of submissions can be replayed deterministically.

use serde::{Deserialize, Serialize};

use crate::progress::QuestProgress;
use crate::quest::{Quest, QuestType};

/// Why a submission did not advance the quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectReason {
    /// The artefact is not part of this quest.
    NotInQuest,
    /// The artefact is part of a sequential quest but is not the next one.
    OutOfOrder { expected: String },
    /// The quest has already been completed.
    QuestCompleted,
}

impl RejectReason {
    /// Message shown to the visitor.
    pub fn message(&self) -> String {
        match self {
            Self::NotInQuest => "That artefact is not part of this quest.".to_string(),
            Self::OutOfOrder { .. } => {
                "That artefact belongs to this quest, but it is not the next one.".to_string()
            }
            Self::QuestCompleted => "This quest is already complete.".to_string(),
        }
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Duplicate,
    Reject(RejectReason),
}

/// Decide whether `artefact_id` advances the quest.
///
/// - `Duplicate` if the artefact was already accepted, including an earlier
///   step of a sequential quest.
/// - `Reject` if the artefact is not part of the quest, or for sequential
///   quests if it is not the artefact at index `submitted.len()`.
/// - `Accept` otherwise.
pub fn decide(progress: &QuestProgress, quest: &Quest, artefact_id: &str) -> Decision {
    if progress.has_submitted(artefact_id) {
        return Decision::Duplicate;
    }
    if !quest.contains_artefact(artefact_id) {
        return Decision::Reject(RejectReason::NotInQuest);
    }
    match quest.quest_type {
        QuestType::Open => Decision::Accept,
        QuestType::Sequential => {
            match quest.artefact_at(progress.submitted_artefact_ids.len()) {
                Some(expected) if expected.artefact_id == artefact_id => Decision::Accept,
                Some(expected) => Decision::Reject(RejectReason::OutOfOrder {
                    expected: expected.artefact_id.clone(),
                }),
                // Every artefact is already submitted, so the id must have
                // been caught as a duplicate above.
                None => Decision::Reject(RejectReason::QuestCompleted),
            }
        }
    }
}

/// A quest is complete exactly when every artefact has been accepted.
pub fn is_complete(progress: &QuestProgress, quest: &Quest) -> bool {
    progress.submitted_artefact_ids.len() == quest.artefacts.len()
}

/// Whether `artefact_id` is the next artefact of a sequential quest.
///
/// Always `false` for open quests. The UI uses this to warn before a likely
/// wrong submission; it never blocks one.
pub fn is_next_sequential(progress: &QuestProgress, quest: &Quest, artefact_id: &str) -> bool {
    quest.is_sequential()
        && quest
            .artefact_at(progress.submitted_artefact_ids.len())
            .is_some_and(|next| next.artefact_id == artefact_id)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::quest::test_quest;

    fn progress_with(quest: &Quest, submitted: &[&str]) -> QuestProgress {
        let mut progress = QuestProgress::new(quest.quest_id.clone(), Utc::now());
        progress.submitted_artefact_ids = submitted.iter().map(|s| s.to_string()).collect();
        progress
    }

    #[test]
    fn open_quest_accepts_any_member_in_any_order() {
        let quest = test_quest("q", QuestType::Open, &["a", "b", "c"]);
        let progress = progress_with(&quest, &["c"]);
        assert_eq!(decide(&progress, &quest, "a"), Decision::Accept);
        assert_eq!(decide(&progress, &quest, "b"), Decision::Accept);
    }

    #[test]
    fn unknown_artefact_is_rejected() {
        let quest = test_quest("q", QuestType::Open, &["a"]);
        let progress = progress_with(&quest, &[]);
        assert_eq!(
            decide(&progress, &quest, "zzz"),
            Decision::Reject(RejectReason::NotInQuest)
        );
    }

    #[test]
    fn sequential_quest_rejects_out_of_order() {
        let quest = test_quest("q", QuestType::Sequential, &["a", "b", "c"]);
        let progress = progress_with(&quest, &[]);
        assert_matches!(
            decide(&progress, &quest, "b"),
            Decision::Reject(RejectReason::OutOfOrder { expected }) if expected == "a"
        );
        assert_eq!(decide(&progress, &quest, "a"), Decision::Accept);
    }

    #[test]
    fn earlier_sequential_step_is_duplicate() {
        let quest = test_quest("q", QuestType::Sequential, &["a", "b", "c"]);
        let progress = progress_with(&quest, &["a", "b"]);
        assert_eq!(decide(&progress, &quest, "a"), Decision::Duplicate);
        assert_eq!(decide(&progress, &quest, "c"), Decision::Accept);
    }

    #[test]
    fn completion_is_a_count() {
        let quest = test_quest("q", QuestType::Open, &["a", "b", "c"]);
        assert!(!is_complete(&progress_with(&quest, &["a", "b"]), &quest));
        assert!(is_complete(&progress_with(&quest, &["b", "a", "c"]), &quest));
    }

    #[test]
    fn next_sequential_predicate() {
        let seq = test_quest("q", QuestType::Sequential, &["a", "b"]);
        let progress = progress_with(&seq, &["a"]);
        assert!(is_next_sequential(&progress, &seq, "b"));
        assert!(!is_next_sequential(&progress, &seq, "a"));

        let open = test_quest("o", QuestType::Open, &["a", "b"]);
        assert!(!is_next_sequential(&progress_with(&open, &[]), &open, "a"));
    }
}
