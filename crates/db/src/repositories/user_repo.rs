//! Minimal repository for `users`.
//!
//! Account management is owned by the surrounding application; the export
//! pipeline only needs identity rows to exist for ownership checks.

use rewind_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "id, username, role, created_at, updated_at";

/// Provides user lookups.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user with the given role.
    pub async fn create(pool: &PgPool, username: &str, role: &str) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, role) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Find a user by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
