//! The clip export pipeline: dispatch, live status streaming, storage
//! governing, and badge hydration.

pub mod dispatch;
pub mod governor;
pub mod hydrate;
pub mod status;

use rewind_db::repositories::ClipExportRepo;
use rewind_db::DbPool;

/// Publish a worker notification, swallowing failures.
///
/// Delivery is at-least-once and workers re-scan for queued rows on every
/// wake-up, so a lost publish is healed by the next dispatch or requeue.
pub(crate) async fn notify_workers_best_effort(pool: &DbPool, payload: &str) {
    if let Err(e) = ClipExportRepo::notify_workers(pool, payload).await {
        tracing::warn!(payload, error = %e, "Failed to notify export workers");
    }
}

/// Best-effort artifact removal. Absence is success; other failures are
/// logged and swallowed (the row is the source of truth, orphan files are
/// reclaimed by a later governor pass).
///
/// Returns `true` when a file was actually unlinked.
pub(crate) async fn remove_file_best_effort(path: &str) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path, error = %e, "Failed to remove export artifact");
            false
        }
    }
}
