//! Badge hydration.
//!
//! When the surrounding UI replaces a clip list wholesale, every live
//! export badge is lost. Hydration rebuilds them in one batch: fetch all
//! active exports for the clips, keep one row per clip by precedence, and
//! self-heal ready rows whose artifact has vanished.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use rewind_core::types::DbId;
use rewind_db::models::clip_export::ClipExport;
use rewind_db::models::status::{ExportStatus, StatusId};
use rewind_db::repositories::ClipExportRepo;
use rewind_db::DbPool;

use super::status::{patch_for_row, ExportStatusPatch};

/// Badge precedence rank; lower wins. In-flight work trumps a finished
/// artifact, and a finished artifact trumps a queued backlog entry.
fn precedence(status_id: StatusId) -> u8 {
    if status_id == ExportStatus::Processing.id() {
        0
    } else if status_id == ExportStatus::Ready.id() {
        1
    } else {
        2
    }
}

/// Keep one row per clip by precedence.
///
/// `rows` must be newest-first (as returned by
/// [`ClipExportRepo::list_active_for_clips`]); the first row seen at a
/// given precedence level is the newest, so only a strictly better rank
/// replaces -- ties resolve to the newest row deterministically.
pub fn dedupe_badges(rows: &[ClipExport]) -> Vec<&ClipExport> {
    let mut best: HashMap<DbId, &ClipExport> = HashMap::new();
    let mut clip_order: Vec<DbId> = Vec::new();

    for row in rows {
        match best.entry(row.clip_id) {
            Entry::Vacant(slot) => {
                slot.insert(row);
                clip_order.push(row.clip_id);
            }
            Entry::Occupied(mut slot) => {
                if precedence(row.status_id) < precedence(slot.get().status_id) {
                    slot.insert(row);
                }
            }
        }
    }

    clip_order.into_iter().map(|id| best[&id]).collect()
}

/// Build the badge patches for a list of clips.
///
/// Ready rows whose artifact is missing are requeued (workers notified) and
/// skipped -- the next hydration sees them queued. Hydration never mutates
/// rows otherwise, so running it twice in a row yields the same badge set.
pub async fn hydrate_badges(
    pool: &DbPool,
    clip_ids: &[DbId],
) -> Result<Vec<ExportStatusPatch>, sqlx::Error> {
    if clip_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = ClipExportRepo::list_active_for_clips(pool, clip_ids).await?;
    let mut patches = Vec::new();

    for row in dedupe_badges(&rows) {
        if row.status_id == ExportStatus::Ready.id() {
            let file_exists = match row.file_path.as_deref() {
                Some(path) => tokio::fs::metadata(path).await.is_ok(),
                None => false,
            };
            if !file_exists {
                ClipExportRepo::requeue(pool, row.id).await?;
                super::notify_workers_best_effort(pool, &row.id.to_string()).await;
                tracing::warn!(
                    export_id = row.id,
                    clip_id = row.clip_id,
                    "Ready artifact missing during hydration; requeued",
                );
                continue;
            }
        }
        patches.push(patch_for_row(row));
    }

    Ok(patches)
}
