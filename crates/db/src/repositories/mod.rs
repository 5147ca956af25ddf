//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod progress_repo;
pub mod quest_repo;
pub mod user_repo;

pub use progress_repo::ProgressRepo;
pub use quest_repo::QuestRepo;
pub use user_repo::UserRepo;
