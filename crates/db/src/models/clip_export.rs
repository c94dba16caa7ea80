//! Clip export entity models and DTOs.

use rewind_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `clip_exports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClipExport {
    pub id: DbId,
    pub clip_id: DbId,
    pub created_by: DbId,
    pub format: String,
    pub variant: String,
    /// Canonical serialisation of the export spec, forwarded to the worker.
    pub spec_blob: String,
    /// Hex SHA-256 of `spec_blob`; the pending-slot index key.
    pub spec_blob_hash: String,
    /// Snapshot of the clip's `updated_at` at enqueue time. Reuse is
    /// invalidated when the clip changes.
    pub clip_updated_at: Timestamp,
    pub status_id: StatusId,
    pub progress_pct: i16,
    pub attempts: i32,
    pub file_path: Option<String>,
    pub size_bytes: Option<i64>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub last_accessed_at: Timestamp,
}

/// Input for inserting a new `queued` export row.
#[derive(Debug, Clone)]
pub struct CreateClipExport {
    pub clip_id: DbId,
    pub created_by: DbId,
    pub format: String,
    pub variant: String,
    pub spec_blob: String,
    pub spec_blob_hash: String,
    pub clip_updated_at: Timestamp,
}

/// Download projection: the export row joined with the owning clip's title
/// and, for `crop:<id>` variants, the crop's name. Used to derive the
/// attachment filename.
#[derive(Debug, Clone, FromRow)]
pub struct ClipExportDownload {
    pub id: DbId,
    pub clip_id: DbId,
    pub created_by: DbId,
    pub format: String,
    pub variant: String,
    pub status_id: StatusId,
    pub file_path: Option<String>,
    pub size_bytes: Option<i64>,
    pub clip_title: String,
    pub crop_name: Option<String>,
}
