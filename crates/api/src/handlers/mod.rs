pub mod accounts;
pub mod artefacts;
pub mod collection;
pub mod progress;
pub mod quests;
