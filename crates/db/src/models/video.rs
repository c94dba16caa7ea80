//! Source video model (consumed, not owned).

use rewind_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: DbId,
    pub title: String,
    pub file_path: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
