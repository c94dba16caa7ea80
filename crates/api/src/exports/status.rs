//! Live export status channel.
//!
//! One SSE stream per request, polling the export row every 500 ms and
//! emitting a patch whenever the observed state changes. Multiple
//! connections for the same export are independent observers of the same
//! row. Client disconnects simply drop the stream; the encoder keeps
//! running and the artifact, if produced, stays reusable.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use rewind_core::types::DbId;
use rewind_db::models::clip_export::ClipExport;
use rewind_db::models::status::{ExportStatus, StatusId};
use rewind_db::repositories::ClipExportRepo;
use rewind_db::DbPool;
use serde::Serialize;

use super::governor;
use crate::state::AppState;

/// How often the export row is re-read.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// SSE comment cadence keeping idle connections alive through proxies.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// SSE event name carrying status patches.
pub const EVENT_EXPORT_STATUS: &str = "export-status";

/// Fallback message for terminal failures without a recorded error.
const FALLBACK_ERROR_MESSAGE: &str = "Export failed";

// ---------------------------------------------------------------------------
// Patch type
// ---------------------------------------------------------------------------

/// One status update pushed to the client.
///
/// `target` is the stable element id the front-end patches
/// (`clip-export-status-<clip_id>`); `redirect` tells the live export
/// stream's client to navigate to `download_url` (auto-download).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportStatusPatch {
    pub clip_id: DbId,
    pub target: String,
    pub state: &'static str,
    pub message: String,
    pub download_url: Option<String>,
    pub redirect: bool,
}

impl ExportStatusPatch {
    fn new(clip_id: DbId, state: &'static str, message: impl Into<String>) -> Self {
        Self {
            clip_id,
            target: status_target(clip_id),
            state,
            message: message.into(),
            download_url: None,
            redirect: false,
        }
    }

    /// Terminal error patch (also used when the row vanishes mid-stream).
    pub fn error(clip_id: DbId, message: impl Into<String>) -> Self {
        Self::new(clip_id, ExportStatus::Error.name(), message)
    }
}

/// The stable element id for a clip's export badge.
pub fn status_target(clip_id: DbId) -> String {
    format!("clip-export-status-{clip_id}")
}

/// Download URL for a ready export.
pub fn download_url(export_id: DbId) -> String {
    format!("/api/clip-exports/{export_id}/download")
}

/// Translate an export row into the patch the client should see.
///
/// `redirect` stays `false`; the live export stream flips it on the ready
/// transition so only that stream triggers an auto-download (hydration
/// badges render the link without navigating).
pub fn patch_for_row(row: &ClipExport) -> ExportStatusPatch {
    if row.status_id == ExportStatus::Processing.id() {
        ExportStatusPatch::new(
            row.clip_id,
            ExportStatus::Processing.name(),
            format!("Exporting {}%…", row.progress_pct),
        )
    } else if row.status_id == ExportStatus::Ready.id() {
        let mut patch = ExportStatusPatch::new(row.clip_id, ExportStatus::Ready.name(), "");
        patch.download_url = Some(download_url(row.id));
        patch
    } else if row.status_id == ExportStatus::Error.id() {
        let message = row
            .last_error
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_ERROR_MESSAGE);
        ExportStatusPatch::error(row.clip_id, message)
    } else {
        ExportStatusPatch::new(row.clip_id, ExportStatus::Queued.name(), "Queued…")
    }
}

/// Wrap a patch in an SSE event.
pub(crate) fn sse_event(patch: &ExportStatusPatch) -> Event {
    Event::default()
        .event(EVENT_EXPORT_STATUS)
        .json_data(patch)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialise status patch");
            Event::default().event(EVENT_EXPORT_STATUS).data("{}")
        })
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

struct PollTask {
    pool: DbPool,
    export_id: DbId,
    clip_id: DbId,
    interval: tokio::time::Interval,
    last: Option<(StatusId, i16)>,
    done: bool,
}

/// Open the status channel for one export.
///
/// A single cooperative task per connection: each tick re-reads the row,
/// suppresses unchanged states, and terminates after emitting a ready or
/// error patch. The first tick fires immediately so the caller sees the
/// current state without waiting out the interval.
pub fn stream_for(
    state: &AppState,
    export_id: DbId,
    clip_id: DbId,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let task = PollTask {
        pool: state.pool.clone(),
        export_id,
        clip_id,
        interval: tokio::time::interval(POLL_INTERVAL),
        last: None,
        done: false,
    };

    let stream = futures::stream::unfold(task, |mut task| async move {
        loop {
            if task.done {
                return None;
            }
            task.interval.tick().await;

            let row = match ClipExportRepo::find_by_id(&task.pool, task.export_id).await {
                Ok(row) => row,
                Err(e) => {
                    tracing::error!(export_id = task.export_id, error = %e, "Status poll failed");
                    task.done = true;
                    let patch = ExportStatusPatch::error(task.clip_id, "Export status unavailable");
                    return Some((Ok(sse_event(&patch)), task));
                }
            };

            let Some(row) = row else {
                task.done = true;
                let patch = ExportStatusPatch::error(task.clip_id, "Export not found");
                return Some((Ok(sse_event(&patch)), task));
            };

            let key = (row.status_id, row.progress_pct);
            if task.last == Some(key) {
                continue;
            }
            task.last = Some(key);

            let mut patch = patch_for_row(&row);

            if row.status_id == ExportStatus::Ready.id() {
                // The live stream triggers the auto-download, and a fresh
                // artifact may have pushed the governed total over budget.
                patch.redirect = true;
                task.done = true;
                let pool = task.pool.clone();
                tokio::spawn(async move {
                    governor::run_pass(&pool).await;
                });
            } else if row.status_id == ExportStatus::Error.id() {
                task.done = true;
            }

            return Some((Ok(sse_event(&patch)), task));
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
