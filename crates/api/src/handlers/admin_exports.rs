//! Admin operations over the export table.
//!
//! All endpoints require the admin role via [`RequireAdmin`]. File removal
//! is always best-effort: a row whose artifact is already gone deletes
//! cleanly, and a second identical bulk call after a race still succeeds
//! with zero rows.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rewind_core::error::CoreError;
use rewind_core::types::DbId;
use rewind_db::models::status::ExportStatus;
use rewind_db::repositories::ClipExportRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::exports::remove_file_best_effort;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of a bulk purge.
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted_rows: u64,
    pub files_removed: u64,
}

/// Result of a bulk requeue.
#[derive(Debug, Serialize)]
pub struct RequeueResponse {
    pub requeued: u64,
}

/// Fetch an export or 404.
async fn ensure_export_exists(
    pool: &sqlx::PgPool,
    id: DbId,
) -> AppResult<rewind_db::models::clip_export::ClipExport> {
    ClipExportRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClipExport",
            id,
        }))
}

// ---------------------------------------------------------------------------
// POST /admin/exports/{id}/delete
// ---------------------------------------------------------------------------

/// Delete one export and its artifact.
pub async fn delete_export(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let export = ensure_export_exists(&state.pool, id).await?;

    if let Some(path) = export.file_path.as_deref() {
        remove_file_best_effort(path).await;
    }
    ClipExportRepo::delete(&state.pool, id).await?;

    tracing::info!(export_id = id, admin_id = admin.user_id, "Export deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /admin/exports/{id}/requeue
// ---------------------------------------------------------------------------

/// Force a re-encode of one export: drop its artifact, reset it to
/// `queued`, and wake the workers.
pub async fn requeue_export(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let export = ensure_export_exists(&state.pool, id).await?;

    if let Some(path) = export.file_path.as_deref() {
        remove_file_best_effort(path).await;
    }
    ClipExportRepo::requeue(&state.pool, id).await?;
    crate::exports::notify_workers_best_effort(&state.pool, &id.to_string()).await;

    tracing::info!(export_id = id, admin_id = admin.user_id, "Export requeued");

    let updated = ensure_export_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// POST /admin/exports/requeue-errors
// ---------------------------------------------------------------------------

/// Send every errored export back to the queue with one worker pulse.
pub async fn requeue_errors(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let requeued = ClipExportRepo::requeue_all_errors(&state.pool).await?;
    if requeued > 0 {
        crate::exports::notify_workers_best_effort(&state.pool, "requeued").await;
    }

    tracing::info!(requeued, admin_id = admin.user_id, "Errored exports requeued");

    Ok(Json(DataResponse {
        data: RequeueResponse { requeued },
    }))
}

// ---------------------------------------------------------------------------
// POST /admin/exports/delete-by-status/{status}
// ---------------------------------------------------------------------------

/// Purge every export in the given status (`queued`, `ready`, or `error`).
///
/// For `ready`, the artifacts are unlinked before the rows go. In-flight
/// (`processing`) exports are not addressable here.
pub async fn delete_by_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(status_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let status = ExportStatus::from_name(&status_name)
        .filter(|s| *s != ExportStatus::Processing)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid status '{status_name}'. Must be one of: queued, ready, error"
            ))
        })?;

    let mut files_removed = 0u64;
    if status == ExportStatus::Ready {
        for path in ClipExportRepo::list_ready_file_paths(&state.pool).await? {
            if remove_file_best_effort(&path).await {
                files_removed += 1;
            }
        }
    }

    let deleted_rows = ClipExportRepo::delete_by_status(&state.pool, status.id()).await?;

    tracing::info!(
        status = status.name(),
        deleted_rows,
        files_removed,
        admin_id = admin.user_id,
        "Exports purged by status",
    );

    Ok(Json(DataResponse {
        data: PurgeResponse {
            deleted_rows,
            files_removed,
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /admin/exports/delete-all
// ---------------------------------------------------------------------------

/// Purge every export row and every ready artifact.
pub async fn delete_all(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let mut files_removed = 0u64;
    for path in ClipExportRepo::list_ready_file_paths(&state.pool).await? {
        if remove_file_best_effort(&path).await {
            files_removed += 1;
        }
    }

    let deleted_rows = ClipExportRepo::delete_all(&state.pool).await?;

    tracing::info!(
        deleted_rows,
        files_removed,
        admin_id = admin.user_id,
        "All exports purged",
    );

    Ok(Json(DataResponse {
        data: PurgeResponse {
            deleted_rows,
            files_removed,
        },
    }))
}
