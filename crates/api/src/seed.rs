//! Startup seeding of quests and users.
//!
//! Quest authoring is not part of this service, so local runs and fresh
//! databases are populated from a JSON file:
//!
//! ```json
//! { "quests": [ ... ], "users": [ ... ] }
//! ```

use std::path::{Path, PathBuf};

use curio_core::collection::User;
use curio_core::error::CoreError;
use curio_core::quest::{validate_quest, Quest};
use curio_core::store::memory::MemoryStore;
use curio_db::repositories::{QuestRepo, UserRepo};
use curio_db::DbPool;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid seed JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("Database error while seeding: {0}")]
    Database(#[from] sqlx::Error),
}

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub quests: Vec<Quest>,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Read and validate a seed file.
pub async fn load_seed(path: &Path) -> Result<SeedData, SeedError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_seed(&raw)
}

/// Parse seed JSON and validate every quest in it.
pub fn parse_seed(raw: &str) -> Result<SeedData, SeedError> {
    let seed: SeedData = serde_json::from_str(raw)?;
    for quest in &seed.quests {
        validate_quest(quest)?;
    }
    Ok(seed)
}

/// Build an in-memory store holding the seed records.
pub fn memory_store(seed: SeedData) -> MemoryStore {
    let store = seed.quests.into_iter().fold(MemoryStore::new(), MemoryStore::with_quest);
    seed.users.into_iter().fold(store, MemoryStore::with_user)
}

/// Upsert the seed quests and create any seed users that do not exist yet.
///
/// Existing users are left untouched so restarts never reset collections.
pub async fn seed_database(pool: &DbPool, seed: &SeedData) -> Result<(), SeedError> {
    for quest in &seed.quests {
        QuestRepo::upsert(pool, quest).await?;
    }
    for user in &seed.users {
        if UserRepo::find_by_id(pool, &user.user_id).await?.is_none() {
            UserRepo::create(pool, user).await?;
        }
    }
    tracing::info!(
        quests = seed.quests.len(),
        users = seed.users.len(),
        "Database seeded",
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use curio_core::store::QuestRecords;

    use super::*;

    const SEED: &str = r#"{
        "quests": [{
            "quest_id": "q1",
            "title": "Egyptian Wing",
            "quest_type": "sequential",
            "artefacts": [
                { "artefact_id": "a1", "name": "Scarab", "hints": ["Look low"] },
                { "artefact_id": "a2", "name": "Canopic jar" }
            ]
        }],
        "users": [{ "user_id": "u1", "email": "u1@museum.test" }]
    }"#;

    #[tokio::test]
    async fn seeds_memory_store() {
        let store = memory_store(parse_seed(SEED).unwrap());
        let quest = store.get_quest("q1").await.unwrap().unwrap();
        assert_eq!(quest.artefacts.len(), 2);
        assert!(quest.artefacts[1].hints.is_empty());
    }

    #[test]
    fn rejects_invalid_quests() {
        let raw = r#"{ "quests": [{ "quest_id": "q1", "title": "Empty", "quest_type": "open", "artefacts": [] }] }"#;
        assert_matches!(parse_seed(raw), Err(SeedError::Invalid(CoreError::Validation(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        assert_matches!(parse_seed("{ not json"), Err(SeedError::Parse(_)));
    }
}
