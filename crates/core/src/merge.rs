//! Merge rules between the optimistic local progress and the durable
//! remote copy.
//!
//! | Field                    | Load merge (`merge_progress`) | Remote patch (`ProgressPatch::apply`) |
//! |--------------------------|-------------------------------|---------------------------------------|
//! | `accepted_at`            | remote                        | set only when the record is created   |
//! | `submitted_artefact_ids` | remote                        | append missing ids                    |
//! | `completed_at`           | remote                        | set once                              |
//! | `attempts`               | per-key maximum               | per-key maximum                       |
//! | `displayed_hints`        | union                         | union                                 |

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::progress::QuestProgress;
use crate::quest::Quest;
use crate::types::{ArtefactId, QuestId, Timestamp};

/// Merge a freshly loaded remote progress record into the local copy.
///
/// The remote submission log is authoritative. Attempts and displayed hints
/// only ever grow, so both sides' knowledge is kept.
pub fn merge_progress(local: &QuestProgress, remote: &QuestProgress) -> QuestProgress {
    let mut attempts = remote.attempts.clone();
    merge_attempts(&mut attempts, &local.attempts);

    QuestProgress {
        quest_id: remote.quest_id.clone(),
        accepted_at: remote.accepted_at,
        submitted_artefact_ids: remote.submitted_artefact_ids.clone(),
        attempts,
        displayed_hints: local
            .displayed_hints
            .union(&remote.displayed_hints)
            .cloned()
            .collect(),
        completed_at: remote.completed_at,
    }
}

/// Extend a stored submission log with the ids of `incoming` it lacks.
///
/// The log is append-only: a patch built from an older, shorter log (a late
/// retry, a second device) never removes or reorders stored ids.
pub fn append_submissions(stored: &mut Vec<ArtefactId>, incoming: &[ArtefactId]) {
    for artefact_id in incoming {
        if !stored.contains(artefact_id) {
            stored.push(artefact_id.clone());
        }
    }
}

/// Raise every count in `into` to at least the matching count in `from`.
pub fn merge_attempts(into: &mut BTreeMap<ArtefactId, u32>, from: &BTreeMap<ArtefactId, u32>) {
    for (artefact_id, &count) in from {
        let entry = into.entry(artefact_id.clone()).or_insert(0);
        *entry = (*entry).max(count);
    }
}

/// A partial update of one progress record, carrying only changed fields.
///
/// `accepted_at` travels with every patch so that a record created by an
/// upsert always has it; it is ignored for existing records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPatch {
    pub accepted_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_artefact_ids: Option<Vec<ArtefactId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<BTreeMap<ArtefactId, u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_hints: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl ProgressPatch {
    /// An empty patch for a record accepted at `accepted_at`.
    pub fn new(accepted_at: Timestamp) -> Self {
        Self {
            accepted_at,
            submitted_artefact_ids: None,
            attempts: None,
            displayed_hints: None,
            completed_at: None,
        }
    }

    /// Patch describing a newly accepted quest.
    pub fn accepted(progress: &QuestProgress) -> Self {
        Self {
            submitted_artefact_ids: Some(progress.submitted_artefact_ids.clone()),
            ..Self::new(progress.accepted_at)
        }
    }

    /// Patch after an accepted submission, including completion if reached.
    pub fn submitted(progress: &QuestProgress) -> Self {
        Self {
            submitted_artefact_ids: Some(progress.submitted_artefact_ids.clone()),
            completed_at: progress.completed_at,
            ..Self::new(progress.accepted_at)
        }
    }

    /// Patch carrying the new count of a single artefact's attempts.
    pub fn attempt(progress: &QuestProgress, artefact_id: &str) -> Self {
        let attempts = BTreeMap::from([(artefact_id.to_string(), progress.attempts_for(artefact_id))]);
        Self {
            attempts: Some(attempts),
            ..Self::new(progress.accepted_at)
        }
    }

    /// Patch announcing newly displayed hint keys.
    pub fn hints(progress: &QuestProgress, keys: &[String]) -> Self {
        Self {
            displayed_hints: Some(keys.iter().cloned().collect()),
            ..Self::new(progress.accepted_at)
        }
    }

    /// Every field of `progress`, used to repair a record the remote lost.
    pub fn snapshot(progress: &QuestProgress) -> Self {
        Self {
            accepted_at: progress.accepted_at,
            submitted_artefact_ids: Some(progress.submitted_artefact_ids.clone()),
            attempts: Some(progress.attempts.clone()),
            displayed_hints: Some(progress.displayed_hints.clone()),
            completed_at: progress.completed_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.submitted_artefact_ids.is_none()
            && self.attempts.is_none()
            && self.displayed_hints.is_none()
            && self.completed_at.is_none()
    }

    /// Apply the patch to the stored record, creating it when absent.
    pub fn apply(&self, quest_id: &QuestId, existing: Option<QuestProgress>) -> QuestProgress {
        let mut record =
            existing.unwrap_or_else(|| QuestProgress::new(quest_id.clone(), self.accepted_at));

        if let Some(submitted) = &self.submitted_artefact_ids {
            append_submissions(&mut record.submitted_artefact_ids, submitted);
        }
        if let Some(attempts) = &self.attempts {
            merge_attempts(&mut record.attempts, attempts);
        }
        if let Some(keys) = &self.displayed_hints {
            record.displayed_hints.extend(keys.iter().cloned());
        }
        if record.completed_at.is_none() {
            record.completed_at = self.completed_at;
        }
        record
    }

    /// Check the patch against the quest it targets before it is stored.
    ///
    /// A submission log must only hold the quest's artefacts, each once, in
    /// authored order for sequential quests. A completion must come with the
    /// full log.
    pub fn validate_for(&self, quest: &Quest) -> Result<(), CoreError> {
        let Some(submitted) = &self.submitted_artefact_ids else {
            return Ok(());
        };

        let mut seen = BTreeSet::new();
        for (index, artefact_id) in submitted.iter().enumerate() {
            if !quest.contains_artefact(artefact_id) {
                return Err(CoreError::Validation(format!(
                    "Artefact '{artefact_id}' is not part of quest '{}'",
                    quest.quest_id
                )));
            }
            if !seen.insert(artefact_id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Artefact '{artefact_id}' is submitted more than once"
                )));
            }
            if quest.is_sequential()
                && quest.artefact_at(index).map(|a| a.artefact_id.as_str()) != Some(artefact_id)
            {
                return Err(CoreError::Validation(format!(
                    "Artefact '{artefact_id}' is out of order for sequential quest '{}'",
                    quest.quest_id
                )));
            }
        }

        if self.completed_at.is_some() && submitted.len() != quest.artefacts.len() {
            return Err(CoreError::Validation(format!(
                "Quest '{}' cannot be completed with {} of {} artefacts",
                quest.quest_id,
                submitted.len(),
                quest.artefacts.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap()
    }

    fn progress(submitted: &[&str], attempts: &[(&str, u32)], hints: &[&str]) -> QuestProgress {
        let mut p = QuestProgress::new("q".into(), t0());
        p.submitted_artefact_ids = submitted.iter().map(|s| s.to_string()).collect();
        p.attempts = attempts.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        p.displayed_hints = hints.iter().map(|s| s.to_string()).collect();
        p
    }

    #[test]
    fn remote_submissions_win() {
        let local = progress(&["a", "b"], &[], &[]);
        let remote = progress(&["a"], &[], &[]);
        assert_eq!(merge_progress(&local, &remote).submitted_artefact_ids, ["a"]);
    }

    #[test]
    fn attempts_take_elementwise_max() {
        let local = progress(&[], &[("a", 3), ("b", 1)], &[]);
        let remote = progress(&[], &[("a", 2), ("b", 4), ("c", 1)], &[]);
        let merged = merge_progress(&local, &remote);
        assert_eq!(merged.attempts_for("a"), 3);
        assert_eq!(merged.attempts_for("b"), 4);
        assert_eq!(merged.attempts_for("c"), 1);
    }

    #[test]
    fn displayed_hints_are_a_union_across_repeated_merges() {
        let mut local = progress(&[], &[], &["a-0"]);
        let remotes = [
            progress(&[], &[], &["b-0"]),
            progress(&[], &[], &[]),
            progress(&[], &[("a", 0)], &["a-1"]),
        ];
        for remote in &remotes {
            let before = local.displayed_hints.clone();
            local = merge_progress(&local, remote);
            assert!(before.is_subset(&local.displayed_hints));
        }
        assert_eq!(local.displayed_hints.len(), 3);
    }

    #[test]
    fn completion_comes_from_remote() {
        let mut local = progress(&["a"], &[], &[]);
        local.completed_at = Some(t0());
        let remote = progress(&[], &[], &[]);
        assert!(merge_progress(&local, &remote).completed_at.is_none());
    }

    #[test]
    fn patch_creates_missing_record_with_accepted_at() {
        let local = progress(&["a"], &[], &[]);
        let record = ProgressPatch::submitted(&local).apply(&"q".to_string(), None);
        assert_eq!(record.accepted_at, t0());
        assert_eq!(record.submitted_artefact_ids, ["a"]);
    }

    #[test]
    fn patch_never_lowers_attempts_or_drops_hints() {
        let existing = progress(&["a"], &[("b", 5)], &["b-0", "b-1"]);
        let mut local = progress(&["a"], &[("b", 2)], &[]);
        local.displayed_hints.insert("c-0".into());

        let record = ProgressPatch::attempt(&local, "b").apply(&"q".into(), Some(existing.clone()));
        assert_eq!(record.attempts_for("b"), 5);

        let record = ProgressPatch::hints(&local, &["c-0".to_string()]).apply(&"q".into(), Some(existing));
        assert_eq!(record.displayed_hints.len(), 3);
    }

    #[test]
    fn late_patch_with_a_shorter_log_keeps_the_stored_log() {
        let mut existing = progress(&["a", "b", "c"], &[], &[]);
        existing.completed_at = Some(t0());
        let stale = progress(&["a"], &[], &[]);

        let record = ProgressPatch::submitted(&stale).apply(&"q".into(), Some(existing));
        assert_eq!(record.submitted_artefact_ids, ["a", "b", "c"]);
        assert_eq!(record.completed_at, Some(t0()));
    }

    #[test]
    fn patch_extends_the_log_without_reordering() {
        let existing = progress(&["a", "b"], &[], &[]);
        let record = ProgressPatch::submitted(&progress(&["a", "b", "c"], &[], &[]))
            .apply(&"q".into(), Some(existing.clone()));
        assert_eq!(record.submitted_artefact_ids, ["a", "b", "c"]);

        let record = ProgressPatch::submitted(&progress(&["c", "a"], &[], &[]))
            .apply(&"q".into(), Some(existing));
        assert_eq!(record.submitted_artefact_ids, ["a", "b", "c"]);
    }

    #[test]
    fn patch_sets_completion_once() {
        let mut existing = progress(&["a"], &[], &[]);
        existing.completed_at = Some(t0());
        let mut local = progress(&["a"], &[], &[]);
        local.completed_at = Some(t0() + Duration::hours(1));

        let record = ProgressPatch::submitted(&local).apply(&"q".into(), Some(existing));
        assert_eq!(record.completed_at, Some(t0()));
    }

    #[test]
    fn snapshot_recreates_the_whole_record() {
        let mut local = progress(&["a"], &[("b", 2)], &["b-0"]);
        local.completed_at = Some(t0());
        let record = ProgressPatch::snapshot(&local).apply(&"q".into(), None);
        assert_eq!(record, local);
    }

    #[test]
    fn patch_serializes_only_changed_fields() {
        let local = progress(&[], &[("a", 1)], &[]);
        let json = serde_json::to_value(ProgressPatch::attempt(&local, "a")).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("attempts"));
        assert!(obj.contains_key("accepted_at"));
        assert!(!obj.contains_key("submitted_artefact_ids"));
        assert!(!obj.contains_key("displayed_hints"));
    }

    #[test]
    fn validation_enforces_membership_and_sequential_order() {
        use crate::quest::{test_quest, QuestType};

        let seq = test_quest("q", QuestType::Sequential, &["a", "b", "c"]);
        let open = test_quest("q", QuestType::Open, &["a", "b", "c"]);

        assert!(ProgressPatch::submitted(&progress(&["a", "b"], &[], &[])).validate_for(&seq).is_ok());
        assert!(ProgressPatch::submitted(&progress(&["b"], &[], &[])).validate_for(&seq).is_err());
        assert!(ProgressPatch::submitted(&progress(&["b"], &[], &[])).validate_for(&open).is_ok());
        assert!(ProgressPatch::submitted(&progress(&["z"], &[], &[])).validate_for(&open).is_err());
        assert!(ProgressPatch::submitted(&progress(&["a", "a"], &[], &[])).validate_for(&open).is_err());
        assert!(ProgressPatch::attempt(&progress(&[], &[("z", 1)], &[]), "z").validate_for(&seq).is_ok());
    }

    #[test]
    fn validation_rejects_early_completion() {
        use crate::quest::{test_quest, QuestType};

        let quest = test_quest("q", QuestType::Open, &["a", "b"]);
        let mut local = progress(&["a"], &[], &[]);
        local.completed_at = Some(t0());
        assert!(ProgressPatch::submitted(&local).validate_for(&quest).is_err());

        local.submitted_artefact_ids.push("b".into());
        assert!(ProgressPatch::submitted(&local).validate_for(&quest).is_ok());
    }
}
