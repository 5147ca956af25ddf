//! Fan-out maintenance across quest records.
//!
//! The store offers no cross-record transactions, so removing a user from
//! every leaderboard is a best-effort saga: scan all quests, rewrite the
//! ones that reference the user concurrently, and report each failure
//! instead of aborting. A quest written between the scan and the rewrite is
//! not covered by that pass.

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::CoreError;
use crate::leaderboard::LeaderboardEntry;
use crate::store::{ProgressRecords, QuestRecords, StoreError, UserRecords};
use crate::types::{ArtefactId, QuestId, UserId};

/// Maximum number of leaderboard rewrites in flight at once.
pub const CASCADE_CONCURRENCY: usize = 8;

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// One quest whose leaderboard could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeFailure {
    pub quest_id: QuestId,
    pub error: String,
}

/// Outcome of [`remove_user_from_all_leaderboards`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
    /// Quests whose leaderboard referenced the user.
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub failures: Vec<CascadeFailure>,
}

/// Outcome of [`delete_account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountDeletionSummary {
    pub user_id: UserId,
    #[serde(flatten)]
    pub leaderboards: CascadeSummary,
    /// Set when the quest scan itself failed and no leaderboard was visited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_error: Option<String>,
    pub progress_records_removed: usize,
    pub user_deleted: bool,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Remove every leaderboard entry of `user_id`.
///
/// Only quests whose leaderboard actually changes are written. Fails only
/// if the initial scan fails.
pub async fn remove_user_from_all_leaderboards<S>(
    store: &S,
    user_id: &str,
) -> Result<CascadeSummary, StoreError>
where
    S: QuestRecords + ?Sized,
{
    let quests = store.list_quests().await?;

    let rewrites: Vec<(QuestId, Vec<LeaderboardEntry>)> = quests
        .into_iter()
        .filter_map(|quest| {
            let before = quest.leaderboard.len();
            let kept: Vec<_> = quest
                .leaderboard
                .into_iter()
                .filter(|entry| entry.user_id != user_id)
                .collect();
            (kept.len() != before).then_some((quest.quest_id, kept))
        })
        .collect();

    let total = rewrites.len();
    let pending: Vec<_> = rewrites
        .into_iter()
        .map(|(quest_id, entries)| rewrite_leaderboard(store, quest_id, entries))
        .collect();
    let results: Vec<(QuestId, Result<(), StoreError>)> = stream::iter(pending)
        .buffer_unordered(CASCADE_CONCURRENCY)
        .collect()
        .await;

    let mut summary = CascadeSummary {
        total,
        ..Default::default()
    };
    for (quest_id, result) in results {
        match result {
            Ok(()) => summary.successful += 1,
            Err(e) => {
                tracing::warn!(%quest_id, user_id, error = %e, "Leaderboard cleanup failed");
                summary.failures.push(CascadeFailure {
                    quest_id,
                    error: e.to_string(),
                });
            }
        }
    }
    summary.failed = summary.failures.len();
    summary.failures.sort_by(|a, b| a.quest_id.cmp(&b.quest_id));

    tracing::info!(
        user_id,
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "Leaderboard cascade finished",
    );
    Ok(summary)
}

async fn rewrite_leaderboard<S>(
    store: &S,
    quest_id: QuestId,
    entries: Vec<LeaderboardEntry>,
) -> (QuestId, Result<(), StoreError>)
where
    S: QuestRecords + ?Sized,
{
    let result = store.put_leaderboard(&quest_id, &entries).await;
    (quest_id, result)
}

/// Delete the account registered under `email`.
///
/// The user's leaderboard entries and progress records are removed first,
/// best effort. The user record is deleted however many of those fail; the
/// failures are reported in the summary for an operator to retry.
pub async fn delete_account<S>(store: &S, email: &str) -> Result<AccountDeletionSummary, CoreError>
where
    S: QuestRecords + ProgressRecords + UserRecords + ?Sized,
{
    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "User",
            id: email.to_string(),
        })?;
    let user_id = user.user_id;

    let (leaderboards, scan_error) = match remove_user_from_all_leaderboards(store, &user_id).await {
        Ok(summary) => (summary, None),
        Err(e) => {
            tracing::error!(%user_id, error = %e, "Quest scan failed, leaderboards not cleaned");
            (CascadeSummary::default(), Some(e.to_string()))
        }
    };

    let progress_records_removed = remove_progress_records(store, &user_id).await;

    let user_deleted = store.delete_user(&user_id).await?;
    tracing::info!(%user_id, user_deleted, "Account deleted");

    Ok(AccountDeletionSummary {
        user_id,
        leaderboards,
        scan_error,
        progress_records_removed,
        user_deleted,
    })
}

async fn remove_progress_records<S>(store: &S, user_id: &str) -> usize
where
    S: ProgressRecords + ?Sized,
{
    let records = match store.list_progress(user_id).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Could not list progress records for cleanup");
            return 0;
        }
    };

    let mut removed = 0;
    for record in records {
        match store.delete_progress(user_id, &record.quest_id).await {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(user_id, quest_id = %record.quest_id, error = %e, "Progress cleanup failed");
            }
        }
    }
    removed
}

/// Ids of quests that reference `artefact_id`, sorted.
///
/// Used before an artefact is removed. Like the cascade, this is a scan and
/// does not see quests written after it.
pub async fn quests_using_artefact<S>(store: &S, artefact_id: &ArtefactId) -> Result<Vec<QuestId>, StoreError>
where
    S: QuestRecords + ?Sized,
{
    let mut ids: Vec<QuestId> = store
        .list_quests()
        .await?
        .into_iter()
        .filter(|quest| quest.contains_artefact(artefact_id))
        .map(|quest| quest.quest_id)
        .collect();
    ids.sort();
    Ok(ids)
}
