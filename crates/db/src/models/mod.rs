//! Database row structs.
//!
//! Each submodule contains a `FromRow` entity struct matching the table
//! row and its conversion into the `curio_core` domain type. Nested lists
//! are JSONB columns decoded through `sqlx::types::Json`.

pub mod progress;
pub mod quest;
pub mod user;
