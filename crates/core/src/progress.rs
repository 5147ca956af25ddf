//! Per-visitor quest progress and the single-active-quest state machine.
//!
//! [`ProgressStore`] owns the in-memory [`QuestProgress`] of the signed-in
//! visitor. All mutations are synchronous; persisting them is the caller's
//! concern (see the `curio-sync` crate).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hints::{self, VisibleHint};
use crate::merge::merge_progress;
use crate::quest::Quest;
use crate::submission::{self, Decision, RejectReason};
use crate::types::{ArtefactId, QuestId, Timestamp};

// ---------------------------------------------------------------------------
// QuestProgress
// ---------------------------------------------------------------------------

/// A visitor's attempt at one quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_id: QuestId,
    /// Set once on accept, never modified.
    pub accepted_at: Timestamp,
    /// Accepted artefacts in submission order, without duplicates.
    #[serde(default)]
    pub submitted_artefact_ids: Vec<ArtefactId>,
    /// Submission attempts per artefact. Counts only grow.
    #[serde(default)]
    pub attempts: BTreeMap<ArtefactId, u32>,
    /// `"{artefact_id}-{hint_index}"` keys of hints already shown. Only grows.
    #[serde(default)]
    pub displayed_hints: BTreeSet<String>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl QuestProgress {
    pub fn new(quest_id: QuestId, accepted_at: Timestamp) -> Self {
        Self {
            quest_id,
            accepted_at,
            submitted_artefact_ids: Vec::new(),
            attempts: BTreeMap::new(),
            displayed_hints: BTreeSet::new(),
            completed_at: None,
        }
    }

    pub fn has_submitted(&self, artefact_id: &str) -> bool {
        self.submitted_artefact_ids.iter().any(|id| id == artefact_id)
    }

    pub fn attempts_for(&self, artefact_id: &str) -> u32 {
        self.attempts.get(artefact_id).copied().unwrap_or(0)
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Seconds between accept and completion, if completed.
    pub fn time_taken_secs(&self) -> Option<i64> {
        self.completed_at
            .map(|completed_at| (completed_at - self.accepted_at).num_seconds())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Data needed to record a finished quest on the leaderboard and in the
/// visitor's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub quest_id: QuestId,
    pub completed_at: Timestamp,
    pub time_taken: i64,
    pub prize: Option<String>,
}

/// Result of [`ProgressStore::submit_artefact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The artefact advanced the quest; `completion` is set when it was the
    /// last one.
    Accepted { completion: Option<Completion> },
    /// The artefact was already accepted. Nothing changed.
    Duplicate,
    /// Wrong or out-of-order artefact. Nothing changed.
    Rejected(RejectReason),
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// A quest together with the visitor's progress on it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestAttempt {
    pub quest: Quest,
    pub progress: QuestProgress,
}

/// The visitor's quest state. At most one quest is ever `Active`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QuestState {
    #[default]
    Idle,
    Active(QuestAttempt),
    Completed(QuestAttempt),
}

/// Owner of the signed-in visitor's quest state.
#[derive(Debug, Default)]
pub struct ProgressStore {
    state: QuestState,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &QuestState {
        &self.state
    }

    fn attempt(&self) -> Option<&QuestAttempt> {
        match &self.state {
            QuestState::Idle => None,
            QuestState::Active(attempt) | QuestState::Completed(attempt) => Some(attempt),
        }
    }

    fn active_mut(&mut self) -> Option<&mut QuestAttempt> {
        match &mut self.state {
            QuestState::Active(attempt) => Some(attempt),
            _ => None,
        }
    }

    /// Progress of the active or most recently completed quest.
    pub fn progress(&self) -> Option<&QuestProgress> {
        self.attempt().map(|a| &a.progress)
    }

    pub fn quest(&self) -> Option<&Quest> {
        self.attempt().map(|a| &a.quest)
    }

    /// Id of the quest currently in progress, if any.
    pub fn active_quest_id(&self) -> Option<&str> {
        match &self.state {
            QuestState::Active(attempt) => Some(attempt.quest.quest_id.as_str()),
            _ => None,
        }
    }

    /// Start `quest`.
    ///
    /// Re-accepting the quest already in progress returns the existing
    /// progress unchanged. A completed quest is superseded.
    pub fn accept_quest(&mut self, quest: Quest, now: Timestamp) -> Result<&QuestProgress, CoreError> {
        if let QuestState::Active(attempt) = &self.state {
            if attempt.quest.quest_id != quest.quest_id {
                return Err(CoreError::AlreadyActive {
                    active: attempt.quest.quest_id.clone(),
                });
            }
        } else {
            if !quest.is_available(now) {
                return Err(CoreError::QuestUnavailable {
                    quest_id: quest.quest_id,
                });
            }
            let progress = QuestProgress::new(quest.quest_id.clone(), now);
            self.state = QuestState::Active(QuestAttempt { quest, progress });
        }

        match &self.state {
            QuestState::Active(attempt) => Ok(&attempt.progress),
            _ => Err(CoreError::Internal("quest state not active after accept".into())),
        }
    }

    /// Adopt a progress record found remotely, e.g. started on another
    /// device. Guarded by the same single-active-quest rule as accept.
    pub fn resume(&mut self, quest: Quest, progress: QuestProgress) -> Result<(), CoreError> {
        if quest.quest_id != progress.quest_id {
            return Err(CoreError::Validation(format!(
                "Progress for quest '{}' cannot resume quest '{}'",
                progress.quest_id, quest.quest_id
            )));
        }
        if let Some(active) = self.active_quest_id() {
            if active != quest.quest_id {
                return Err(CoreError::AlreadyActive {
                    active: active.to_string(),
                });
            }
        }
        let attempt = QuestAttempt { quest, progress };
        self.state = if attempt.progress.is_completed() {
            QuestState::Completed(attempt)
        } else {
            QuestState::Active(attempt)
        };
        Ok(())
    }

    /// Discard the quest in progress. Returns its id, or `None` if there was
    /// nothing to cancel.
    pub fn cancel_quest(&mut self) -> Option<QuestId> {
        match std::mem::take(&mut self.state) {
            QuestState::Active(attempt) => Some(attempt.quest.quest_id),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Forget all state, e.g. on sign-out.
    pub fn clear(&mut self) {
        self.state = QuestState::Idle;
    }

    /// Count a submission attempt against `artefact_id`. Returns the new
    /// count, or `None` when no quest is in progress or the artefact is not
    /// part of it.
    pub fn record_attempt(&mut self, artefact_id: &str) -> Option<u32> {
        let attempt = self.active_mut()?;
        if !attempt.quest.contains_artefact(artefact_id) {
            return None;
        }
        let count = attempt
            .progress
            .attempts
            .entry(artefact_id.to_string())
            .or_insert(0);
        *count = count.saturating_add(1);
        Some(*count)
    }

    /// The artefact a submission of `artefact_id` counts as an attempt on.
    ///
    /// In a sequential quest the visitor is hunting the next artefact, so
    /// every submission counts against it. In an open quest the submitted
    /// artefact itself is the target.
    pub fn attempt_target(&self, artefact_id: &str) -> ArtefactId {
        self.attempt()
            .filter(|a| a.quest.is_sequential())
            .and_then(|a| a.quest.artefact_at(a.progress.submitted_artefact_ids.len()))
            .map(|next| next.artefact_id.clone())
            .unwrap_or_else(|| artefact_id.to_string())
    }

    /// Submit an artefact to the current quest.
    pub fn submit_artefact(
        &mut self,
        artefact_id: &str,
        now: Timestamp,
    ) -> Result<SubmissionOutcome, CoreError> {
        let attempt = match &mut self.state {
            QuestState::Idle => {
                return Err(CoreError::NotFound {
                    entity: "QuestProgress",
                    id: artefact_id.to_string(),
                })
            }
            QuestState::Completed(attempt) => {
                return Ok(if attempt.progress.has_submitted(artefact_id) {
                    SubmissionOutcome::Duplicate
                } else {
                    SubmissionOutcome::Rejected(RejectReason::QuestCompleted)
                });
            }
            QuestState::Active(attempt) => attempt,
        };

        match submission::decide(&attempt.progress, &attempt.quest, artefact_id) {
            Decision::Duplicate => return Ok(SubmissionOutcome::Duplicate),
            Decision::Reject(reason) => return Ok(SubmissionOutcome::Rejected(reason)),
            Decision::Accept => {}
        }

        attempt.progress.submitted_artefact_ids.push(artefact_id.to_string());
        if !submission::is_complete(&attempt.progress, &attempt.quest) {
            return Ok(SubmissionOutcome::Accepted { completion: None });
        }

        attempt.progress.completed_at = Some(now);
        let completion = Completion {
            quest_id: attempt.quest.quest_id.clone(),
            completed_at: now,
            time_taken: (now - attempt.progress.accepted_at).num_seconds(),
            prize: attempt.quest.prize.clone(),
        };
        if let QuestState::Active(attempt) = std::mem::take(&mut self.state) {
            self.state = QuestState::Completed(attempt);
        }
        Ok(SubmissionOutcome::Accepted {
            completion: Some(completion),
        })
    }

    pub fn is_next_sequential(&self, artefact_id: &str) -> bool {
        self.attempt().is_some_and(|a| {
            submission::is_next_sequential(&a.progress, &a.quest, artefact_id)
        })
    }

    /// Hints currently visible for `artefact_id`.
    pub fn visible_hints(&self, artefact_id: &str) -> Vec<VisibleHint<'_>> {
        self.attempt()
            .map(|a| hints::visible_hints(&a.progress, &a.quest, artefact_id))
            .unwrap_or_default()
    }

    /// Record every visible-but-unrecorded hint of `artefact_id` as
    /// displayed and return the newly recorded keys.
    pub fn reveal_hints(&mut self, artefact_id: &str) -> Vec<String> {
        let Some(attempt) = self.active_mut() else {
            return Vec::new();
        };
        let keys = hints::newly_visible_keys(&attempt.progress, &attempt.quest, artefact_id);
        attempt.progress.displayed_hints.extend(keys.iter().cloned());
        keys
    }

    /// Merge a remote copy of the current quest's progress into local state.
    ///
    /// Returns `false` if `remote` belongs to a different quest and was
    /// ignored.
    pub fn merge_remote(&mut self, remote: &QuestProgress) -> bool {
        let attempt = match std::mem::take(&mut self.state) {
            QuestState::Active(attempt) | QuestState::Completed(attempt)
                if attempt.quest.quest_id == remote.quest_id =>
            {
                attempt
            }
            other => {
                self.state = other;
                return false;
            }
        };

        let progress = merge_progress(&attempt.progress, remote);
        let attempt = QuestAttempt {
            quest: attempt.quest,
            progress,
        };
        self.state = if attempt.progress.is_completed() {
            QuestState::Completed(attempt)
        } else {
            QuestState::Active(attempt)
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::quest::{test_quest, DateRange, QuestType};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap()
    }

    #[test]
    fn accept_creates_empty_progress() {
        let mut store = ProgressStore::new();
        let progress = store
            .accept_quest(test_quest("q1", QuestType::Open, &["a"]), t0())
            .unwrap();
        assert_eq!(progress.accepted_at, t0());
        assert!(progress.submitted_artefact_ids.is_empty());
        assert!(progress.attempts.is_empty());
        assert!(progress.displayed_hints.is_empty());
        assert_eq!(store.active_quest_id(), Some("q1"));
    }

    #[test]
    fn second_active_quest_is_refused() {
        let mut store = ProgressStore::new();
        store.accept_quest(test_quest("q1", QuestType::Open, &["a"]), t0()).unwrap();
        let err = store
            .accept_quest(test_quest("q2", QuestType::Open, &["b"]), t0())
            .unwrap_err();
        assert_matches!(err, CoreError::AlreadyActive { active } if active == "q1");
        assert_eq!(store.active_quest_id(), Some("q1"));
    }

    #[test]
    fn reaccepting_the_active_quest_keeps_attempts() {
        let mut store = ProgressStore::new();
        let quest = test_quest("q1", QuestType::Open, &["a"]);
        store.accept_quest(quest.clone(), t0()).unwrap();
        store.record_attempt("a");
        let progress = store.accept_quest(quest, t0() + Duration::minutes(5)).unwrap();
        assert_eq!(progress.attempts_for("a"), 1);
        assert_eq!(progress.accepted_at, t0());
    }

    #[test]
    fn unavailable_quest_cannot_be_accepted() {
        let mut store = ProgressStore::new();
        let mut quest = test_quest("q1", QuestType::Open, &["a"]);
        quest.date_range = Some(DateRange {
            from: t0() + Duration::days(1),
            to: t0() + Duration::days(2),
        });
        assert_matches!(
            store.accept_quest(quest, t0()),
            Err(CoreError::QuestUnavailable { .. })
        );
        assert_eq!(store.state(), &QuestState::Idle);
    }

    #[test]
    fn cancel_discards_active_quest_only() {
        let mut store = ProgressStore::new();
        assert_eq!(store.cancel_quest(), None);

        store.accept_quest(test_quest("q1", QuestType::Open, &["a"]), t0()).unwrap();
        assert_eq!(store.cancel_quest(), Some("q1".to_string()));
        assert_eq!(store.state(), &QuestState::Idle);

        store.accept_quest(test_quest("q2", QuestType::Open, &["a"]), t0()).unwrap();
        store.submit_artefact("a", t0()).unwrap();
        assert_eq!(store.cancel_quest(), None);
        assert_matches!(store.state(), QuestState::Completed(_));
    }

    #[test]
    fn attempts_never_reset() {
        let mut store = ProgressStore::new();
        store.accept_quest(test_quest("q1", QuestType::Open, &["a", "b", "c"]), t0()).unwrap();
        assert_eq!(store.record_attempt("c"), Some(1));
        assert_eq!(store.record_attempt("c"), Some(2));
        store.submit_artefact("a", t0()).unwrap();
        assert_eq!(store.record_attempt("c"), Some(3));
    }

    #[test]
    fn attempts_on_foreign_artefacts_are_ignored() {
        let mut store = ProgressStore::new();
        store.accept_quest(test_quest("q1", QuestType::Open, &["a"]), t0()).unwrap();
        assert_eq!(store.record_attempt("wrong"), None);
        assert!(store.progress().unwrap().attempts.is_empty());
    }

    #[test]
    fn sequential_walkthrough() {
        let mut store = ProgressStore::new();
        let mut quest = test_quest("Q1", QuestType::Sequential, &["A", "B", "C"]);
        quest.prize = Some("Tote bag".into());
        store.accept_quest(quest, t0()).unwrap();

        assert_matches!(
            store.submit_artefact("B", t0()).unwrap(),
            SubmissionOutcome::Rejected(RejectReason::OutOfOrder { .. })
        );
        assert_eq!(
            store.submit_artefact("A", t0()).unwrap(),
            SubmissionOutcome::Accepted { completion: None }
        );
        assert_eq!(store.progress().unwrap().submitted_artefact_ids.len(), 1);
        assert_eq!(store.submit_artefact("A", t0()).unwrap(), SubmissionOutcome::Duplicate);
        assert_eq!(
            store.submit_artefact("B", t0()).unwrap(),
            SubmissionOutcome::Accepted { completion: None }
        );
        assert!(store.progress().unwrap().completed_at.is_none());

        let done = t0() + Duration::seconds(754);
        let outcome = store.submit_artefact("C", done).unwrap();
        let completion = assert_matches!(
            outcome,
            SubmissionOutcome::Accepted { completion: Some(c) } => c
        );
        assert_eq!(completion.time_taken, 754);
        assert_eq!(completion.prize.as_deref(), Some("Tote bag"));
        assert_eq!(store.progress().unwrap().completed_at, Some(done));
        assert_eq!(store.progress().unwrap().submitted_artefact_ids, ["A", "B", "C"]);

        // Completed: repeats are duplicates and never complete twice.
        assert_eq!(store.submit_artefact("C", done).unwrap(), SubmissionOutcome::Duplicate);
    }

    #[test]
    fn open_quest_final_set_is_order_independent() {
        let orders: [[&str; 4]; 3] = [
            ["a", "b", "c", "zz"],
            ["c", "zz", "a", "b"],
            ["b", "c", "a", "a"],
        ];
        for order in orders {
            let mut store = ProgressStore::new();
            store.accept_quest(test_quest("q", QuestType::Open, &["a", "b", "c"]), t0()).unwrap();
            for id in order {
                store.submit_artefact(id, t0()).unwrap();
            }
            let mut submitted = store.progress().unwrap().submitted_artefact_ids.clone();
            submitted.sort();
            assert_eq!(submitted, ["a", "b", "c"]);
        }
    }

    #[test]
    fn sequential_progress_is_always_a_prefix() {
        let quest = test_quest("q", QuestType::Sequential, &["a", "b", "c", "d"]);
        let mut store = ProgressStore::new();
        store.accept_quest(quest.clone(), t0()).unwrap();
        for id in ["c", "a", "d", "b", "a", "d", "c", "d"] {
            store.submit_artefact(id, t0()).unwrap();
            let submitted = &store.progress().unwrap().submitted_artefact_ids;
            let expected: Vec<_> = quest.artefacts[..submitted.len()]
                .iter()
                .map(|a| a.artefact_id.clone())
                .collect();
            assert_eq!(submitted, &expected);
        }
        assert!(store.progress().unwrap().is_completed());
    }

    #[test]
    fn submit_without_quest_is_an_error() {
        let mut store = ProgressStore::new();
        assert_matches!(
            store.submit_artefact("a", t0()),
            Err(CoreError::NotFound { .. })
        );
    }

    #[test]
    fn attempt_target_follows_sequential_order() {
        let mut store = ProgressStore::new();
        store.accept_quest(test_quest("q", QuestType::Sequential, &["a", "b"]), t0()).unwrap();
        assert_eq!(store.attempt_target("b"), "a");
        store.submit_artefact("a", t0()).unwrap();
        assert_eq!(store.attempt_target("zzz"), "b");

        let mut open = ProgressStore::new();
        open.accept_quest(test_quest("o", QuestType::Open, &["a", "b"]), t0()).unwrap();
        assert_eq!(open.attempt_target("b"), "b");
    }

    #[test]
    fn reveal_hints_records_each_key_once() {
        let mut quest = test_quest("q", QuestType::Open, &["a"]);
        quest.artefacts[0].hints = vec!["one".into(), "two".into()];
        let mut store = ProgressStore::new();
        store.accept_quest(quest, t0()).unwrap();

        assert!(store.reveal_hints("a").is_empty());
        store.record_attempt("a");
        assert_eq!(store.reveal_hints("a"), ["a-0"]);
        assert!(store.reveal_hints("a").is_empty());
        store.record_attempt("a");
        store.record_attempt("a");
        assert_eq!(store.reveal_hints("a"), ["a-1"]);
        assert_eq!(store.visible_hints("a").len(), 2);
    }

    #[test]
    fn merge_remote_ignores_other_quests() {
        let mut store = ProgressStore::new();
        store.accept_quest(test_quest("q1", QuestType::Open, &["a"]), t0()).unwrap();
        let remote = QuestProgress::new("q2".into(), t0());
        assert!(!store.merge_remote(&remote));
        assert_eq!(store.active_quest_id(), Some("q1"));
    }

    #[test]
    fn merge_remote_can_complete_the_quest() {
        let mut store = ProgressStore::new();
        store.accept_quest(test_quest("q1", QuestType::Open, &["a"]), t0()).unwrap();
        let mut remote = QuestProgress::new("q1".into(), t0());
        remote.submitted_artefact_ids.push("a".into());
        remote.completed_at = Some(t0() + Duration::minutes(3));

        assert!(store.merge_remote(&remote));
        assert_matches!(store.state(), QuestState::Completed(_));
        assert_eq!(store.active_quest_id(), None);
    }

    #[test]
    fn resume_respects_single_active_quest() {
        let mut store = ProgressStore::new();
        store.accept_quest(test_quest("q1", QuestType::Open, &["a"]), t0()).unwrap();
        let other = test_quest("q2", QuestType::Open, &["b"]);
        let progress = QuestProgress::new("q2".into(), t0());
        assert_matches!(store.resume(other, progress), Err(CoreError::AlreadyActive { .. }));
    }
}
