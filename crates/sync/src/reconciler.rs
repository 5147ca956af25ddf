//! Background persistence of local quest mutations.
//!
//! Every request runs on a task tracked by a [`TaskTracker`] and is tagged
//! with the quest it was issued for and the reconciler's generation at the
//! time. The generation moves whenever the session switches quest, cancels
//! or signs out, so a response that arrives after such a switch can be
//! recognised and dropped.
//!
//! Cancellation tokens form a tree: the session token is the parent of one
//! token per quest. Cancelling a quest stops its pending requests; signing
//! out stops everything. Requests the remote already acknowledged are never
//! compensated.

use std::future::Future;
use std::sync::Arc;

use curio_core::collection::UserCollection;
use curio_core::leaderboard::{AppendOutcome, LeaderboardEntry};
use curio_core::merge::ProgressPatch;
use curio_core::progress::QuestProgress;
use curio_core::store::{CollectionRecords, LeaderboardRecords, ProgressRecords, StoreError};
use curio_core::types::{QuestId, UserId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::remote::Remote;
use crate::retry::{send_with_retry, RetryConfig, RetryOutcome};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Result of one background request.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEventKind {
    /// A patch was stored; carries the record as the remote now holds it.
    ProgressSaved(QuestProgress),
    ProgressDeleted,
    /// Result of a refresh of the current quest.
    ProgressLoaded(Option<QuestProgress>),
    LeaderboardAppended(AppendOutcome),
    CollectionSaved,
    /// The request failed after its retry and was dropped.
    Dropped {
        operation: &'static str,
        error: String,
    },
}

/// A tagged response from the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEvent {
    /// Quest the request was issued for. `None` for user-wide requests.
    pub quest_id: Option<QuestId>,
    pub generation: u64,
    pub kind: SyncEventKind,
}

// ---------------------------------------------------------------------------
// SyncReconciler
// ---------------------------------------------------------------------------

/// Spawns background requests against a [`Remote`].
///
/// Request methods spawn onto the current Tokio runtime and must be called
/// from within one.
pub struct SyncReconciler<R> {
    remote: Arc<R>,
    user_id: UserId,
    retry: RetryConfig,
    generation: u64,
    session_token: CancellationToken,
    quest_token: CancellationToken,
    tracker: TaskTracker,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl<R: Remote> SyncReconciler<R> {
    pub fn new(remote: Arc<R>, user_id: UserId, retry: RetryConfig) -> Self {
        let session_token = CancellationToken::new();
        let quest_token = session_token.child_token();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            remote,
            user_id,
            retry,
            generation: 0,
            session_token,
            quest_token,
            tracker: TaskTracker::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn session_token(&self) -> &CancellationToken {
        &self.session_token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start tagging requests for a new quest.
    ///
    /// Requests of the previous quest keep running: after a completion they
    /// still carry the final patch and leaderboard entry.
    pub fn begin_quest(&mut self) -> u64 {
        self.quest_token = self.session_token.child_token();
        self.generation += 1;
        self.generation
    }

    /// Cancel every pending request of the current quest.
    pub fn cancel_quest(&mut self) -> u64 {
        self.quest_token.cancel();
        self.begin_quest()
    }

    /// Cancel every pending request. Nothing sent afterwards leaves the
    /// client.
    pub fn sign_out(&mut self) {
        self.session_token.cancel();
        self.generation += 1;
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Send a partial progress update. Empty patches are not sent.
    pub fn save_progress(&self, quest_id: &str, patch: ProgressPatch) {
        if patch.is_empty() {
            return;
        }
        let remote = Arc::clone(&self.remote);
        let user_id = self.user_id.clone();
        let target = quest_id.to_string();
        self.spawn("save_progress", Some(quest_id), self.quest_token.clone(), move || {
            let remote = Arc::clone(&remote);
            let user_id = user_id.clone();
            let target = target.clone();
            let patch = patch.clone();
            async move {
                remote
                    .patch_progress(&user_id, &target, &patch)
                    .await
                    .map(SyncEventKind::ProgressSaved)
            }
        });
    }

    /// Delete the remote record of a cancelled quest.
    ///
    /// Runs under the fresh quest token, so the cancellation that triggered
    /// it does not stop it.
    pub fn delete_progress(&self, quest_id: &str) {
        let remote = Arc::clone(&self.remote);
        let user_id = self.user_id.clone();
        let target = quest_id.to_string();
        self.spawn("delete_progress", Some(quest_id), self.quest_token.clone(), move || {
            let remote = Arc::clone(&remote);
            let user_id = user_id.clone();
            let target = target.clone();
            async move {
                remote
                    .delete_progress(&user_id, &target)
                    .await
                    .map(|_| SyncEventKind::ProgressDeleted)
            }
        });
    }

    /// Re-read the remote record of the current quest.
    pub fn load_progress(&self, quest_id: &str) {
        let remote = Arc::clone(&self.remote);
        let user_id = self.user_id.clone();
        let target = quest_id.to_string();
        self.spawn("load_progress", Some(quest_id), self.quest_token.clone(), move || {
            let remote = Arc::clone(&remote);
            let user_id = user_id.clone();
            let target = target.clone();
            async move {
                remote
                    .get_progress(&user_id, &target)
                    .await
                    .map(SyncEventKind::ProgressLoaded)
            }
        });
    }

    /// Append a completion to the quest's leaderboard.
    pub fn append_leaderboard(&self, quest_id: &str, entry: LeaderboardEntry) {
        let remote = Arc::clone(&self.remote);
        let target = quest_id.to_string();
        self.spawn("append_leaderboard", Some(quest_id), self.session_token.clone(), move || {
            let remote = Arc::clone(&remote);
            let target = target.clone();
            let entry = entry.clone();
            async move {
                remote
                    .append_entry(&target, &entry)
                    .await
                    .map(SyncEventKind::LeaderboardAppended)
            }
        });
    }

    /// Replace the remote collection with the complete local copy.
    pub fn save_collection(&self, collection: UserCollection) {
        let remote = Arc::clone(&self.remote);
        let user_id = self.user_id.clone();
        self.spawn("save_collection", None, self.session_token.clone(), move || {
            let remote = Arc::clone(&remote);
            let user_id = user_id.clone();
            let collection = collection.clone();
            async move {
                remote
                    .put_collection(&user_id, &collection)
                    .await
                    .map(|()| SyncEventKind::CollectionSaved)
            }
        });
    }

    fn spawn<F, Fut>(
        &self,
        operation: &'static str,
        quest_id: Option<&str>,
        token: CancellationToken,
        request: F,
    ) where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<SyncEventKind, StoreError>> + Send + 'static,
    {
        let quest_id = quest_id.map(str::to_string);
        let generation = self.generation;
        let retry = self.retry.clone();
        let events = self.events_tx.clone();

        self.tracker.spawn(async move {
            let kind = match send_with_retry(operation, &retry, &token, request).await {
                RetryOutcome::Done(kind) => kind,
                RetryOutcome::Failed(e) => SyncEventKind::Dropped {
                    operation,
                    error: e.to_string(),
                },
                RetryOutcome::Cancelled => {
                    tracing::debug!(operation, quest_id = ?quest_id, generation, "Sync request cancelled");
                    return;
                }
            };
            // The receiver lives as long as the reconciler.
            let _ = events.send(SyncEvent {
                quest_id,
                generation,
                kind,
            });
        });
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Every event received so far, oldest first.
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait until every request spawned so far has finished.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Number of requests still in flight.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }
}
