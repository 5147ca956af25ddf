//! Repository for the `users` table.

use curio_core::collection::{User, UserCollection};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::user::UserRow;

/// Column list shared across queries.
const COLUMNS: &str = "user_id, email, artefacts_collected, completed_quests, created_at, updated_at";

/// Provides user lookups, collection replacement and deletion.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user with its collection.
    pub async fn create(pool: &PgPool, user: &User) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (user_id, email, artefacts_collected, completed_quests) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(&user.user_id)
            .bind(&user.email)
            .bind(Json(&user.collection.artefacts_collected))
            .bind(Json(&user.collection.completed_quests))
            .fetch_one(pool)
            .await
    }

    /// Find a user by id.
    pub async fn find_by_id(pool: &PgPool, user_id: &str) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE user_id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Replace both collection lists.
    ///
    /// Returns `false` if the user does not exist.
    pub async fn replace_collection(
        pool: &PgPool,
        user_id: &str,
        collection: &UserCollection,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET artefacts_collected = $2, completed_quests = $3, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(Json(&collection.artefacts_collected))
        .bind(Json(&collection.completed_quests))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
