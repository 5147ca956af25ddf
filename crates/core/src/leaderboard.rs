//! Per-quest leaderboards.
//!
//! A leaderboard is a list nested in the quest record. The store has no
//! "insert if absent" primitive for nested lists, so appends read the
//! current list, check it and write back the merged list.

use serde::{Deserialize, Serialize};

use crate::store::{QuestRecords, StoreError};
use crate::types::UserId;

/// One finisher on a quest's leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    /// Seconds between accepting and completing the quest.
    #[serde(default)]
    pub time_taken: Option<i64>,
    #[serde(default)]
    pub prize: Option<String>,
}

impl LeaderboardEntry {
    /// The completion time, or `None` when missing or negative.
    pub fn valid_time(&self) -> Option<i64> {
        self.time_taken.filter(|t| *t >= 0)
    }
}

/// Result of [`append_on_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendOutcome {
    Appended,
    /// The user already had an entry; nothing was written.
    AlreadyPresent,
}

/// A leaderboard entry with its display rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    /// 1-based rank; `None` for entries without a valid time.
    pub rank: Option<usize>,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Sort ascending by time taken. Entries with a missing or invalid time go
/// last; ties keep their existing order.
pub fn sort_leaderboard(entries: &mut [LeaderboardEntry]) {
    entries.sort_by_key(|entry| match entry.valid_time() {
        Some(t) => (false, t),
        None => (true, 0),
    });
}

/// Sorted copy of `entries` with ranks attached.
pub fn ranked(entries: &[LeaderboardEntry]) -> Vec<RankedEntry> {
    let mut sorted = entries.to_vec();
    sort_leaderboard(&mut sorted);
    sorted
        .into_iter()
        .enumerate()
        .map(|(position, entry)| RankedEntry {
            rank: entry.valid_time().map(|_| position + 1),
            entry,
        })
        .collect()
}

/// Append `entry` to the quest's leaderboard unless the user is already on
/// it.
///
/// The check-then-write is not atomic: two racing completions by the same
/// user can both pass the check. Entries are keyed by user when read back,
/// and a later account deletion removes every copy.
pub async fn append_on_complete<S>(
    store: &S,
    quest_id: &str,
    entry: &LeaderboardEntry,
) -> Result<AppendOutcome, StoreError>
where
    S: QuestRecords + ?Sized,
{
    let quest = store
        .get_quest(quest_id)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "Quest",
            id: quest_id.to_string(),
        })?;

    if quest.leaderboard.iter().any(|e| e.user_id == entry.user_id) {
        tracing::debug!(quest_id, user_id = %entry.user_id, "Leaderboard entry already present");
        return Ok(AppendOutcome::AlreadyPresent);
    }

    let mut entries = quest.leaderboard;
    entries.push(entry.clone());
    sort_leaderboard(&mut entries);
    store.put_leaderboard(quest_id, &entries).await?;

    tracing::info!(
        quest_id,
        user_id = %entry.user_id,
        time_taken = ?entry.time_taken,
        "Leaderboard entry appended",
    );
    Ok(AppendOutcome::Appended)
}
