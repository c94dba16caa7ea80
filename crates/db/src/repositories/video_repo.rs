//! Read-side repository for `videos`.

use rewind_core::types::DbId;
use sqlx::PgPool;

use crate::models::video::Video;

/// Column list for `videos` queries.
const COLUMNS: &str = "id, title, file_path, created_at, updated_at";

/// Provides video lookups for the export pipeline.
pub struct VideoRepo;

impl VideoRepo {
    /// Insert a new video.
    pub async fn create(pool: &PgPool, title: &str, file_path: &str) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos (title, file_path) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(title)
            .bind(file_path)
            .fetch_one(pool)
            .await
    }

    /// Find a video by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
