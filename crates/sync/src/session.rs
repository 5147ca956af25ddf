//! The signed-in visitor's context object.
//!
//! [`Session`] owns the single-active-quest state, the visitor's collection
//! and the reconciler. Every mutation is applied locally first and returns
//! immediately; persistence happens in the background. [`Session::load`]
//! is the one awaited operation: it merges the remote copy into local state
//! when the app starts or comes back to the foreground.

use std::future::Future;
use std::sync::Arc;

use curio_core::collection::UserCollection;
use curio_core::error::CoreError;
use curio_core::hints::VisibleHint;
use curio_core::leaderboard::LeaderboardEntry;
use curio_core::merge::ProgressPatch;
use curio_core::progress::{Completion, ProgressStore, QuestProgress, QuestState, SubmissionOutcome};
use curio_core::quest::Quest;
use curio_core::store::{CollectionRecords, ProgressRecords, StoreError};
use curio_core::types::{QuestId, Timestamp, UserId};

use crate::error::SyncError;
use crate::reconciler::{SyncEvent, SyncEventKind, SyncReconciler};
use crate::remote::{QuestSource, Remote};
use crate::retry::{send_with_retry, RetryConfig, RetryOutcome};

/// Counters over the events a session has processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub applied: usize,
    /// Responses for a quest or generation that is no longer current.
    pub discarded: usize,
    /// Requests that failed after their retry.
    pub dropped: usize,
}

/// What [`Session::load`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Quest adopted from the remote because nothing was active locally.
    pub resumed: Option<QuestId>,
    /// Local progress changed while merging the remote record.
    pub merged: bool,
    /// The remote had no record of the local quest and a full copy was sent.
    pub repaired: bool,
    /// The local collection gained items from the remote.
    pub collection_changed: bool,
}

pub struct Session<R> {
    user_id: UserId,
    progress: ProgressStore,
    collection: UserCollection,
    reconciler: SyncReconciler<R>,
    stats: SyncStats,
}

impl<R: Remote> Session<R> {
    pub fn new(remote: Arc<R>, user_id: impl Into<UserId>, retry: RetryConfig) -> Self {
        let user_id = user_id.into();
        Self {
            reconciler: SyncReconciler::new(remote, user_id.clone(), retry),
            user_id,
            progress: ProgressStore::new(),
            collection: UserCollection::default(),
            stats: SyncStats::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn collection(&self) -> &UserCollection {
        &self.collection
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn generation(&self) -> u64 {
        self.reconciler.generation()
    }

    // -----------------------------------------------------------------------
    // Quest lifecycle
    // -----------------------------------------------------------------------

    /// Accept `quest`. Fails with [`CoreError::AlreadyActive`] while another
    /// quest is in progress. Accepting the active quest again is a no-op.
    pub fn accept_quest(&mut self, quest: Quest, now: Timestamp) -> Result<QuestProgress, CoreError> {
        if self.progress.active_quest_id() == Some(quest.quest_id.as_str()) {
            return self.progress.accept_quest(quest, now).cloned();
        }

        let progress = self.progress.accept_quest(quest, now)?.clone();
        self.reconciler.begin_quest();
        self.reconciler
            .save_progress(&progress.quest_id, ProgressPatch::accepted(&progress));
        tracing::info!(user_id = %self.user_id, quest_id = %progress.quest_id, "Quest accepted");
        Ok(progress)
    }

    /// Abandon the quest in progress and delete its remote record.
    ///
    /// Pending requests of the quest are cancelled; any that the remote has
    /// already acknowledged stay applied until the delete lands.
    pub fn cancel_quest(&mut self) -> Option<QuestId> {
        let quest_id = self.progress.cancel_quest()?;
        self.reconciler.cancel_quest();
        self.reconciler.delete_progress(&quest_id);
        tracing::info!(user_id = %self.user_id, %quest_id, "Quest cancelled");
        Some(quest_id)
    }

    /// Submit an artefact to the quest in progress.
    ///
    /// Every submission counts as an attempt on the artefact being hunted.
    /// An accepted submission updates the collection; the one completing
    /// the quest also appends the leaderboard entry.
    pub fn submit(&mut self, artefact_id: &str, now: Timestamp) -> Result<SubmissionOutcome, CoreError> {
        let target = self.progress.attempt_target(artefact_id);
        self.record_attempt(&target);

        let outcome = self.progress.submit_artefact(artefact_id, now)?;
        if let SubmissionOutcome::Accepted { completion } = &outcome {
            self.on_accepted(artefact_id, completion.as_ref());
        }
        Ok(outcome)
    }

    /// Count an attempt against `artefact_id` without submitting anything,
    /// e.g. when the visitor opens the hints of the artefact they are
    /// hunting. Attempts on artefacts outside the quest are ignored.
    pub fn record_attempt(&mut self, artefact_id: &str) -> Option<u32> {
        let count = self.progress.record_attempt(artefact_id)?;
        if let Some(progress) = self.progress.progress() {
            self.reconciler
                .save_progress(&progress.quest_id, ProgressPatch::attempt(progress, artefact_id));
        }
        Some(count)
    }

    fn on_accepted(&mut self, artefact_id: &str, completion: Option<&Completion>) {
        let Some(progress) = self.progress.progress() else {
            return;
        };
        let quest_id = progress.quest_id.clone();
        self.reconciler
            .save_progress(&quest_id, ProgressPatch::submitted(progress));

        let mut changed = self.collection.collect_artefact(artefact_id);
        if let Some(completion) = completion {
            changed |= self.collection.record_completion(completion);
            self.reconciler.append_leaderboard(
                &quest_id,
                LeaderboardEntry {
                    user_id: self.user_id.clone(),
                    time_taken: Some(completion.time_taken),
                    prize: completion.prize.clone(),
                },
            );
            tracing::info!(
                user_id = %self.user_id,
                %quest_id,
                time_taken = completion.time_taken,
                "Quest completed",
            );
        }
        if changed {
            self.reconciler.save_collection(self.collection.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Hints
    // -----------------------------------------------------------------------

    pub fn visible_hints(&self, artefact_id: &str) -> Vec<VisibleHint<'_>> {
        self.progress.visible_hints(artefact_id)
    }

    /// Mark the visible hints of `artefact_id` as displayed and notify the
    /// remote of the new keys. Returns the newly displayed keys.
    pub fn reveal_hints(&mut self, artefact_id: &str) -> Vec<String> {
        let keys = self.progress.reveal_hints(artefact_id);
        if !keys.is_empty() {
            if let Some(progress) = self.progress.progress() {
                self.reconciler
                    .save_progress(&progress.quest_id, ProgressPatch::hints(progress, &keys));
            }
        }
        keys
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Fetch the remote progress and collection and merge them into local
    /// state.
    ///
    /// - The local quest is merged with its remote record; if the remote has
    ///   none, the full local record is sent to recreate it.
    /// - With no quest in progress locally, an incomplete remote record
    ///   (started on another device) is resumed.
    /// - A locally completed quest re-sends its leaderboard entry, which the
    ///   remote ignores if already present.
    /// - The collection is merged as a union and sent back if the remote
    ///   was missing anything.
    pub async fn load(&mut self) -> Result<LoadSummary, SyncError> {
        let remote = Arc::clone(self.reconciler.remote());
        let user_id = self.user_id.clone();
        let mut summary = LoadSummary::default();

        let records = self
            .fetch("list_progress", || remote.list_progress(&user_id))
            .await?;

        if let Some(quest_id) = self.progress.quest().map(|q| q.quest_id.clone()) {
            match records.iter().find(|r| r.quest_id == quest_id) {
                Some(record) => {
                    let before = self.progress.progress().cloned();
                    self.progress.merge_remote(record);
                    summary.merged = before.as_ref() != self.progress.progress();
                }
                None => {
                    if let Some(progress) = self.progress.progress() {
                        tracing::warn!(%user_id, %quest_id, "Remote lost the quest record, resending");
                        self.reconciler
                            .save_progress(&quest_id, ProgressPatch::snapshot(progress));
                        summary.repaired = true;
                    }
                }
            }
        }

        self.resend_completion();

        if self.progress.active_quest_id().is_none() {
            let pending = records
                .iter()
                .filter(|r| !r.is_completed())
                .filter(|r| self.progress.quest().map_or(true, |q| q.quest_id != r.quest_id))
                .max_by_key(|r| r.accepted_at);
            if let Some(record) = pending {
                let quest = self
                    .fetch("fetch_quest", || remote.fetch_quest(&record.quest_id))
                    .await?;
                match quest {
                    Some(quest) => {
                        self.progress.resume(quest, record.clone())?;
                        self.reconciler.begin_quest();
                        summary.resumed = Some(record.quest_id.clone());
                        tracing::info!(%user_id, quest_id = %record.quest_id, "Resumed quest from remote");
                    }
                    None => {
                        tracing::warn!(%user_id, quest_id = %record.quest_id, "Remote progress references an unknown quest");
                    }
                }
            }
        }

        let remote_collection = self
            .fetch("get_collection", || remote.get_collection(&user_id))
            .await?;
        summary.collection_changed = self.collection.merge(&remote_collection);
        let mut remote_view = remote_collection;
        if remote_view.merge(&self.collection) {
            self.reconciler.save_collection(self.collection.clone());
        }

        tracing::debug!(%user_id, ?summary, "Session loaded");
        Ok(summary)
    }

    fn resend_completion(&self) {
        let QuestState::Completed(attempt) = self.progress.state() else {
            return;
        };
        let entry = LeaderboardEntry {
            user_id: self.user_id.clone(),
            time_taken: attempt.progress.time_taken_secs(),
            prize: attempt.quest.prize.clone(),
        };
        self.reconciler.append_leaderboard(&attempt.quest.quest_id, entry);
    }

    /// Re-read the current quest's record in the background. The result is
    /// merged by [`Session::apply_events`].
    pub fn refresh(&self) {
        if let Some(quest) = self.progress.quest() {
            self.reconciler.load_progress(&quest.quest_id);
        }
    }

    /// Process every response received so far. Responses for another quest
    /// or an older generation are discarded. Returns the number applied.
    pub fn apply_events(&mut self) -> usize {
        let mut applied = 0;
        for event in self.reconciler.drain_events() {
            if !self.is_current(&event) {
                tracing::debug!(
                    quest_id = ?event.quest_id,
                    generation = event.generation,
                    current = self.reconciler.generation(),
                    "Discarding stale sync response",
                );
                self.stats.discarded += 1;
                continue;
            }
            match event.kind {
                SyncEventKind::ProgressLoaded(Some(remote)) => {
                    self.progress.merge_remote(&remote);
                }
                SyncEventKind::Dropped { .. } => self.stats.dropped += 1,
                _ => {}
            }
            self.stats.applied += 1;
            applied += 1;
        }
        applied
    }

    fn is_current(&self, event: &SyncEvent) -> bool {
        let Some(quest_id) = &event.quest_id else {
            return true;
        };
        event.generation == self.reconciler.generation()
            && self.progress.quest().is_some_and(|q| &q.quest_id == quest_id)
    }

    /// Wait for every pending request, then apply their responses.
    pub async fn flush(&mut self) -> usize {
        self.reconciler.flush().await;
        self.apply_events()
    }

    /// Cancel everything in flight and drop local state.
    pub async fn sign_out(mut self) {
        self.reconciler.sign_out();
        self.progress.clear();
        self.reconciler.flush().await;
        tracing::info!(user_id = %self.user_id, "Signed out");
    }

    async fn fetch<T, F, Fut>(&self, operation: &'static str, request: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        match send_with_retry(
            operation,
            self.reconciler.retry_config(),
            self.reconciler.session_token(),
            request,
        )
        .await
        {
            RetryOutcome::Done(value) => Ok(value),
            RetryOutcome::Failed(e) => Err(e.into()),
            RetryOutcome::Cancelled => Err(SyncError::Cancelled),
        }
    }
}
