//! Repository for the `clip_exports` table.
//!
//! This is the single shared mutable state between the API and the encoder
//! worker pool. The API creates, requeues, touches, and deletes rows; the
//! worker flips status, progress, and the artifact columns. Status ids are
//! always bound from `ExportStatus`, never as literals.

use rewind_core::channels::CHANNEL_CLIP_EXPORTS;
use rewind_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::clip_export::{ClipExport, ClipExportDownload, CreateClipExport};
use crate::models::status::{ExportStatus, StatusId};

/// Column list for `clip_exports` queries.
const COLUMNS: &str = "\
    id, clip_id, created_by, format, variant, spec_blob, spec_blob_hash, \
    clip_updated_at, status_id, progress_pct, attempts, \
    file_path, size_bytes, last_error, \
    created_at, updated_at, last_accessed_at";

/// Provides storage operations for clip exports.
pub struct ClipExportRepo;

impl ClipExportRepo {
    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Find a ready row matching the full reuse fingerprint.
    ///
    /// `clip_updated_at` must equal the clip's current `updated_at`; a clip
    /// edit therefore misses here and forces a re-encode. Older identical
    /// rows with a stale snapshot may coexist -- the newest match wins.
    /// The caller still has to stat `file_path` and treat a vanished file
    /// as a miss.
    pub async fn find_reusable(
        pool: &PgPool,
        clip_id: DbId,
        created_by: DbId,
        format: &str,
        variant: &str,
        spec_blob_hash: &str,
        clip_updated_at: Timestamp,
    ) -> Result<Option<ClipExport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clip_exports \
             WHERE clip_id = $1 AND created_by = $2 AND format = $3 AND variant = $4 \
               AND spec_blob_hash = $5 AND clip_updated_at = $6 AND status_id = $7 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ClipExport>(&query)
            .bind(clip_id)
            .bind(created_by)
            .bind(format)
            .bind(variant)
            .bind(spec_blob_hash)
            .bind(clip_updated_at)
            .bind(ExportStatus::Ready.id())
            .fetch_optional(pool)
            .await
    }

    /// Find the queued/processing row holding the pending slot for this
    /// fingerprint, if any. The pending fingerprint deliberately drops
    /// `clip_updated_at` -- a stale in-flight job is still the same job.
    pub async fn find_pending(
        pool: &PgPool,
        clip_id: DbId,
        created_by: DbId,
        format: &str,
        variant: &str,
        spec_blob_hash: &str,
    ) -> Result<Option<ClipExport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clip_exports \
             WHERE clip_id = $1 AND created_by = $2 AND format = $3 AND variant = $4 \
               AND spec_blob_hash = $5 AND status_id IN ($6, $7) \
             LIMIT 1"
        );
        sqlx::query_as::<_, ClipExport>(&query)
            .bind(clip_id)
            .bind(created_by)
            .bind(format)
            .bind(variant)
            .bind(spec_blob_hash)
            .bind(ExportStatus::Queued.id())
            .bind(ExportStatus::Processing.id())
            .fetch_optional(pool)
            .await
    }

    /// Atomically return the existing pending row for this fingerprint or
    /// create a new `queued` one. Concurrent identical callers observe the
    /// same row; exactly one of them observes `created = true`.
    ///
    /// Atomicity comes from `uq_clip_exports_pending`: the insert is
    /// `ON CONFLICT … DO NOTHING` against the partial unique index, so a
    /// lost race falls through to re-reading the winner's row.
    pub async fn find_or_create_pending(
        pool: &PgPool,
        input: &CreateClipExport,
    ) -> Result<(ClipExport, bool), sqlx::Error> {
        // Fast path: attach to an existing pending row.
        if let Some(existing) = Self::find_pending(
            pool,
            input.clip_id,
            input.created_by,
            &input.format,
            &input.variant,
            &input.spec_blob_hash,
        )
        .await?
        {
            return Ok((existing, false));
        }

        let query = format!(
            "INSERT INTO clip_exports \
                 (clip_id, created_by, format, variant, spec_blob, spec_blob_hash, \
                  clip_updated_at, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (clip_id, created_by, format, variant, spec_blob_hash) \
                 WHERE status_id IN ({queued}, {processing}) \
                 DO NOTHING \
             RETURNING {COLUMNS}",
            queued = ExportStatus::Queued.id(),
            processing = ExportStatus::Processing.id(),
        );
        let created = sqlx::query_as::<_, ClipExport>(&query)
            .bind(input.clip_id)
            .bind(input.created_by)
            .bind(&input.format)
            .bind(&input.variant)
            .bind(&input.spec_blob)
            .bind(&input.spec_blob_hash)
            .bind(input.clip_updated_at)
            .bind(ExportStatus::Queued.id())
            .fetch_optional(pool)
            .await?;

        if let Some(row) = created {
            return Ok((row, true));
        }

        // Lost the insert race; the winner's row is pending now. If it
        // reached a terminal state in the meantime the request is
        // retryable, so surface it as a storage error.
        Self::find_pending(
            pool,
            input.clip_id,
            input.created_by,
            &input.format,
            &input.variant,
            &input.spec_blob_hash,
        )
        .await?
        .map(|row| (row, false))
        .ok_or(sqlx::Error::RowNotFound)
    }

    /// Unconditional insert of a new `queued` row.
    ///
    /// [`find_or_create_pending`](Self::find_or_create_pending) subsumes
    /// this in the dispatch path; kept for callers that already hold the
    /// pending slot (and for tests seeding specific states).
    pub async fn create(
        pool: &PgPool,
        input: &CreateClipExport,
    ) -> Result<ClipExport, sqlx::Error> {
        let query = format!(
            "INSERT INTO clip_exports \
                 (clip_id, created_by, format, variant, spec_blob, spec_blob_hash, \
                  clip_updated_at, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClipExport>(&query)
            .bind(input.clip_id)
            .bind(input.created_by)
            .bind(&input.format)
            .bind(&input.variant)
            .bind(&input.spec_blob)
            .bind(&input.spec_blob_hash)
            .bind(input.clip_updated_at)
            .bind(ExportStatus::Queued.id())
            .fetch_one(pool)
            .await
    }

    /// Find an export by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ClipExport>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clip_exports WHERE id = $1");
        sqlx::query_as::<_, ClipExport>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Download projection: the export joined with the clip title and, for
    /// `crop:<id>` variants, the crop's name (for filename derivation).
    pub async fn find_for_download(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ClipExportDownload>, sqlx::Error> {
        sqlx::query_as::<_, ClipExportDownload>(
            "SELECT e.id, e.clip_id, e.created_by, e.format, e.variant, e.status_id, \
                    e.file_path, e.size_bytes, \
                    c.title AS clip_title, cr.name AS crop_name \
             FROM clip_exports e \
             JOIN clips c ON c.id = e.clip_id \
             LEFT JOIN clip_crops cr \
                 ON cr.clip_id = e.clip_id AND e.variant = 'crop:' || cr.id::text \
             WHERE e.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Worker-side transitions (idempotent on retries)
    // -----------------------------------------------------------------------

    /// Record encoder progress. The first tick also flips the row from
    /// `queued` to `processing`.
    pub async fn update_progress(pool: &PgPool, id: DbId, pct: i16) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE clip_exports \
             SET status_id = $2, progress_pct = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(ExportStatus::Processing.id())
        .bind(pct.clamp(0, 100))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Flip a row to `ready` with its artifact path and size.
    ///
    /// Status, path, and size move in one UPDATE so a reader that sees
    /// `ready` also sees the final artifact columns.
    pub async fn mark_ready(
        pool: &PgPool,
        id: DbId,
        file_path: &str,
        size_bytes: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE clip_exports \
             SET status_id = $2, file_path = $3, size_bytes = $4, progress_pct = 100, \
                 updated_at = NOW(), last_accessed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(ExportStatus::Ready.id())
        .bind(file_path)
        .bind(size_bytes)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Flip a row to `error` with the encoder's failure message.
    pub async fn mark_error(pool: &PgPool, id: DbId, message: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE clip_exports \
             SET status_id = $2, last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(ExportStatus::Error.id())
        .bind(message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Bump the attempt counter without touching status.
    pub async fn increment_attempts(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE clip_exports SET attempts = attempts + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // API-side transitions
    // -----------------------------------------------------------------------

    /// Send a row back to `queued`: clears the artifact columns and the
    /// error, bumps `attempts`.
    pub async fn requeue(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE clip_exports \
             SET status_id = $2, progress_pct = 0, file_path = NULL, size_bytes = NULL, \
                 last_error = NULL, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(ExportStatus::Queued.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record an access for LRU purposes.
    pub async fn touch_accessed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE clip_exports SET last_accessed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Bulk transition every `error` row back to `queued`. Returns the
    /// number of rows moved.
    pub async fn requeue_all_errors(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE clip_exports \
             SET status_id = $1, progress_pct = 0, file_path = NULL, size_bytes = NULL, \
                 last_error = NULL, attempts = attempts + 1, updated_at = NOW() \
             WHERE status_id = $2",
        )
        .bind(ExportStatus::Queued.id())
        .bind(ExportStatus::Error.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Governor queries
    // -----------------------------------------------------------------------

    /// All ready rows in least-recently-accessed-first order.
    pub async fn list_oldest_ready(pool: &PgPool) -> Result<Vec<ClipExport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clip_exports \
             WHERE status_id = $1 \
             ORDER BY last_accessed_at ASC, id ASC"
        );
        sqlx::query_as::<_, ClipExport>(&query)
            .bind(ExportStatus::Ready.id())
            .fetch_all(pool)
            .await
    }

    /// Sum of `size_bytes` over ready rows (the governed total).
    pub async fn total_ready_bytes(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM clip_exports WHERE status_id = $1",
        )
        .bind(ExportStatus::Ready.id())
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Hydration
    // -----------------------------------------------------------------------

    /// Every non-terminal-or-ready export for the given clips, newest first
    /// (so per-clip dedup can take the first row of each precedence level).
    pub async fn list_active_for_clips(
        pool: &PgPool,
        clip_ids: &[DbId],
    ) -> Result<Vec<ClipExport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clip_exports \
             WHERE clip_id = ANY($1) AND status_id IN ($2, $3, $4) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ClipExport>(&query)
            .bind(clip_ids)
            .bind(ExportStatus::Queued.id())
            .bind(ExportStatus::Processing.id())
            .bind(ExportStatus::Ready.id())
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Delete one row. Returns `false` when it was already gone.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clip_exports WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// File paths of ready rows with a recorded artifact, for the unlink
    /// phase of bulk deletions.
    pub async fn list_ready_file_paths(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT file_path FROM clip_exports \
             WHERE status_id = $1 AND file_path IS NOT NULL",
        )
        .bind(ExportStatus::Ready.id())
        .fetch_all(pool)
        .await
    }

    /// Delete every row in the given status. Returns the number deleted.
    pub async fn delete_by_status(pool: &PgPool, status: StatusId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clip_exports WHERE status_id = $1")
            .bind(status)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every export row. Returns the number deleted.
    pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clip_exports").execute(pool).await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Worker notification
    // -----------------------------------------------------------------------

    /// Publish a payload on the `clip_exports` Postgres channel.
    ///
    /// The channel is the sole handoff to the encoder worker pool; there is
    /// no in-process queue. Delivery is at-least-once -- workers treat every
    /// notification as a wake-up and re-scan for `queued` rows, so duplicate
    /// publishes are harmless.
    pub async fn notify_workers(pool: &PgPool, payload: &str) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANNEL_CLIP_EXPORTS)
            .bind(payload)
            .execute(pool)
            .await?;
        tracing::debug!(channel = CHANNEL_CLIP_EXPORTS, payload, "Workers notified");
        Ok(())
    }
}
