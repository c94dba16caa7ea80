//! Clip and crop models.
//!
//! The export pipeline consumes clips, it does not own them: rows are
//! created and edited by the clip CRUD surface, and the pipeline only ever
//! reads them (plus `updated_at` as the freshness snapshot).

use rewind_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `clips` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Clip {
    pub id: DbId,
    pub video_id: DbId,
    pub title: String,
    pub start_secs: f64,
    pub end_secs: f64,
    /// User-authored filter stack, opaque to the pipeline.
    pub filter_stack: serde_json::Value,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A named rectangular region of a clip's video.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClipCrop {
    pub id: DbId,
    pub clip_id: DbId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub created_at: Timestamp,
}

/// Input for creating a clip (used by the surrounding CRUD surface and the
/// test fixtures).
#[derive(Debug, Clone)]
pub struct CreateClip {
    pub video_id: DbId,
    pub title: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub created_by: DbId,
}
