pub mod admin;
pub mod exports;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// POST /api/clips/{id}/export                 start or join an export (SSE)
/// GET  /api/clip-exports/{id}/status          attach to an export stream (SSE)
/// GET  /api/clip-exports/{id}/download        download a ready artifact
/// GET  /api/videos/{id}/bank-export-status    rebuild badges for a video (SSE)
/// ```
pub fn api_routes() -> Router<AppState> {
    exports::router()
}

/// Build the `/admin` route tree.
///
/// ```text
/// POST /admin/exports/{id}/delete             delete one export + artifact
/// POST /admin/exports/{id}/requeue            force a re-encode
/// POST /admin/exports/requeue-errors          bulk error -> queued
/// POST /admin/exports/delete-by-status/{s}    purge by status
/// POST /admin/exports/delete-all              purge everything
/// ```
pub fn admin_routes() -> Router<AppState> {
    admin::router()
}
