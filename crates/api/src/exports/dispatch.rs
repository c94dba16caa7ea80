//! Export dispatch engine.
//!
//! Resolves a canonicalised export request to the row a status stream
//! should follow: serve an existing artifact, requeue one whose file
//! vanished, attach to an in-flight job, or create a new row and notify
//! the encoder workers. Each step is atomic with respect to competing
//! requests for the same fingerprint (the storage layer enforces the
//! pending slot).

use rewind_core::error::CoreError;
use rewind_core::export_spec::ExportSpec;
use rewind_core::types::DbId;
use rewind_db::models::clip::Clip;
use rewind_db::models::clip_export::CreateClipExport;
use rewind_db::repositories::{ClipExportRepo, ClipRepo};
use rewind_db::DbPool;

use super::governor;
use crate::error::{AppError, AppResult};

/// Run the dispatch decision procedure. Returns the export id to follow.
pub async fn dispatch_export(
    pool: &DbPool,
    clip: &Clip,
    user_id: DbId,
    spec: &ExportSpec,
) -> AppResult<DbId> {
    // crop:<id> variants must reference one of the clip's own crops.
    if let Some(crop_id) = spec.variant.crop_id() {
        ClipRepo::find_crop(pool, crop_id)
            .await?
            .filter(|crop| crop.clip_id == clip.id)
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Crop",
                id: crop_id,
            }))?;
    }

    let variant = spec.variant.as_str();

    // Reuse: a ready artifact for the same fingerprint and an unchanged clip.
    if let Some(hit) = ClipExportRepo::find_reusable(
        pool,
        clip.id,
        user_id,
        &spec.format,
        &variant,
        &spec.spec_blob_hash,
        clip.updated_at,
    )
    .await?
    {
        let file_exists = match hit.file_path.as_deref() {
            Some(path) => tokio::fs::metadata(path).await.is_ok(),
            None => false,
        };

        if file_exists {
            ClipExportRepo::touch_accessed(pool, hit.id).await?;
            governor::run_pass(pool).await;
            tracing::info!(
                export_id = hit.id,
                clip_id = clip.id,
                user_id,
                "Export request served from existing artifact",
            );
            return Ok(hit.id);
        }

        // The row says ready but the artifact is gone: send it back to the
        // queue and let the stream follow the re-encode.
        ClipExportRepo::requeue(pool, hit.id).await?;
        super::notify_workers_best_effort(pool, &hit.id.to_string()).await;
        tracing::warn!(
            export_id = hit.id,
            clip_id = clip.id,
            "Reusable artifact missing on disk; requeued",
        );
        return Ok(hit.id);
    }

    // No reusable artifact: attach to the pending slot or claim it.
    let input = CreateClipExport {
        clip_id: clip.id,
        created_by: user_id,
        format: spec.format.clone(),
        variant,
        spec_blob: spec.spec_blob.clone(),
        spec_blob_hash: spec.spec_blob_hash.clone(),
        clip_updated_at: clip.updated_at,
    };
    let (export, created) = ClipExportRepo::find_or_create_pending(pool, &input).await?;

    if created {
        super::notify_workers_best_effort(pool, &export.id.to_string()).await;
        tracing::info!(
            export_id = export.id,
            clip_id = clip.id,
            user_id,
            format = %export.format,
            variant = %export.variant,
            "Export queued",
        );
    } else {
        tracing::info!(
            export_id = export.id,
            clip_id = clip.id,
            user_id,
            "Attached to in-flight export",
        );
    }

    Ok(export.id)
}
