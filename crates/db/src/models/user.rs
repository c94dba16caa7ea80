//! Minimal user identity model consumed by auth and ownership checks.

use rewind_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub role: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
