//! Progressive hint visibility.
//!
//! A visitor earns one hint per recorded attempt on an artefact, up to the
//! number of hints authored for it. Once shown, a hint stays shown: the
//! `displayed_hints` keys of a progress record are part of the visible set
//! even if the attempt count is later merged down. Nothing is shown for an
//! artefact that is already collected or once the quest is complete.

use crate::progress::QuestProgress;
use crate::quest::Quest;

/// Key recorded in `displayed_hints` for hint `index` of `artefact_id`.
pub fn hint_key(artefact_id: &str, index: usize) -> String {
    format!("{artefact_id}-{index}")
}

/// A hint the visitor may currently see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleHint<'a> {
    pub index: usize,
    pub key: String,
    pub text: &'a str,
}

/// Hints of `artefact_id` visible for the given progress, in authored order.
pub fn visible_hints<'q>(
    progress: &QuestProgress,
    quest: &'q Quest,
    artefact_id: &str,
) -> Vec<VisibleHint<'q>> {
    if progress.is_completed() || progress.has_submitted(artefact_id) {
        return Vec::new();
    }
    let Some(artefact) = quest.artefact(artefact_id) else {
        return Vec::new();
    };

    let earned = (progress.attempts_for(artefact_id) as usize).min(artefact.hints.len());

    artefact
        .hints
        .iter()
        .enumerate()
        .filter_map(|(index, text)| {
            let key = hint_key(artefact_id, index);
            let visible = index < earned || progress.displayed_hints.contains(&key);
            visible.then_some(VisibleHint { index, key, text })
        })
        .collect()
}

/// Keys that are visible now but have not been recorded as displayed.
pub fn newly_visible_keys(progress: &QuestProgress, quest: &Quest, artefact_id: &str) -> Vec<String> {
    visible_hints(progress, quest, artefact_id)
        .into_iter()
        .filter(|hint| !progress.displayed_hints.contains(&hint.key))
        .map(|hint| hint.key)
        .collect()
}
