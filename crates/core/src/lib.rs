//! Curio quest engine core.
//!
//! Pure domain logic for the museum scavenger hunt: quest definitions,
//! per-visitor progress, hint visibility, submission decisions, the
//! local/remote merge rules and the leaderboard cascade. The crate has no
//! database dependency; persistence is reached through the traits in
//! [`store`].

pub mod cascade;
pub mod collection;
pub mod error;
pub mod hints;
pub mod leaderboard;
pub mod merge;
pub mod progress;
pub mod quest;
pub mod store;
pub mod submission;
pub mod types;
