//! Read-side repository for `clips` and `clip_crops`.
//!
//! The export pipeline never edits clips; `touch` exists so the clip CRUD
//! surface (and the tests standing in for it) can advance `updated_at`.

use rewind_core::types::DbId;
use sqlx::PgPool;

use crate::models::clip::{Clip, ClipCrop, CreateClip};

/// Column list for `clips` queries.
const COLUMNS: &str =
    "id, video_id, title, start_secs, end_secs, filter_stack, created_by, created_at, updated_at";

/// Column list for `clip_crops` queries.
const CROP_COLUMNS: &str = "id, clip_id, name, x, y, width, height, created_at";

/// Provides clip lookups for the export pipeline.
pub struct ClipRepo;

impl ClipRepo {
    /// Insert a new clip.
    pub async fn create(pool: &PgPool, input: &CreateClip) -> Result<Clip, sqlx::Error> {
        let query = format!(
            "INSERT INTO clips (video_id, title, start_secs, end_secs, created_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Clip>(&query)
            .bind(input.video_id)
            .bind(&input.title)
            .bind(input.start_secs)
            .bind(input.end_secs)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a clip by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Clip>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clips WHERE id = $1");
        sqlx::query_as::<_, Clip>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of every clip belonging to a video, oldest first.
    pub async fn list_ids_by_video(pool: &PgPool, video_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM clips WHERE video_id = $1 ORDER BY id ASC")
            .bind(video_id)
            .fetch_all(pool)
            .await
    }

    /// Advance a clip's `updated_at`, invalidating export reuse.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE clips SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Insert a named crop for a clip.
    pub async fn create_crop(
        pool: &PgPool,
        clip_id: DbId,
        name: &str,
        rect: (i32, i32, i32, i32),
    ) -> Result<ClipCrop, sqlx::Error> {
        let query = format!(
            "INSERT INTO clip_crops (clip_id, name, x, y, width, height) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {CROP_COLUMNS}"
        );
        let (x, y, width, height) = rect;
        sqlx::query_as::<_, ClipCrop>(&query)
            .bind(clip_id)
            .bind(name)
            .bind(x)
            .bind(y)
            .bind(width)
            .bind(height)
            .fetch_one(pool)
            .await
    }

    /// Find a crop by its ID.
    pub async fn find_crop(pool: &PgPool, crop_id: DbId) -> Result<Option<ClipCrop>, sqlx::Error> {
        let query = format!("SELECT {CROP_COLUMNS} FROM clip_crops WHERE id = $1");
        sqlx::query_as::<_, ClipCrop>(&query)
            .bind(crop_id)
            .fetch_optional(pool)
            .await
    }
}
