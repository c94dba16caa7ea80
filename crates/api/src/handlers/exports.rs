//! Handlers for the clip export pipeline endpoints.
//!
//! All endpoints require authentication via [`AuthUser`]. Ownership checks
//! mirror the clip CRUD surface: users act on their own clips and exports,
//! admins on any.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rewind_core::error::CoreError;
use rewind_core::export_spec::{ExportRequest, ExportSpec, VARIANT_FULL};
use rewind_core::naming::export_filename;
use rewind_core::roles::ROLE_ADMIN;
use rewind_core::types::DbId;
use rewind_db::models::status::ExportStatus;
use rewind_db::repositories::{ClipExportRepo, ClipRepo, VideoRepo};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::exports::status::sse_event;
use crate::exports::{dispatch, governor, hydrate, status};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Content type served for a given export format.
fn content_type_for(format: &str) -> &'static str {
    match format {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Reject callers that neither own the resource nor hold the admin role.
fn ensure_owner_or_admin(owner_id: DbId, auth: &AuthUser, action: &str) -> AppResult<()> {
    if owner_id != auth.user_id && auth.role != ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's export"
        ))));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// POST /api/clips/{id}/export
// ---------------------------------------------------------------------------

/// Start (or join) an export for a clip.
///
/// Canonicalises the request, runs the dispatch decision procedure, and
/// responds with a live SSE status stream that terminates on `ready` (with
/// the download URL and an auto-download instruction) or `error`.
pub async fn start_export(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(clip_id): Path<DbId>,
    Json(body): Json<ExportRequest>,
) -> AppResult<impl IntoResponse> {
    let clip = ClipRepo::find_by_id(&state.pool, clip_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Clip",
            id: clip_id,
        }))?;

    if clip.created_by != auth.user_id && auth.role != ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot export another user's clip".into(),
        )));
    }

    let spec = ExportSpec::canonicalise(&body)?;
    let export_id = dispatch::dispatch_export(&state.pool, &clip, auth.user_id, &spec).await?;

    Ok(status::stream_for(&state, export_id, clip.id))
}

// ---------------------------------------------------------------------------
// GET /api/clip-exports/{id}/status
// ---------------------------------------------------------------------------

/// Attach to an existing export's status stream.
pub async fn export_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(export_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let export = ClipExportRepo::find_by_id(&state.pool, export_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClipExport",
            id: export_id,
        }))?;

    ensure_owner_or_admin(export.created_by, &auth, "watch")?;

    Ok(status::stream_for(&state, export.id, export.clip_id))
}

// ---------------------------------------------------------------------------
// GET /api/clip-exports/{id}/download
// ---------------------------------------------------------------------------

/// Download a ready export artifact as an attachment.
///
/// A ready row whose file has been removed out from under us answers 410,
/// requeues the export, and notifies the workers -- the next request for the
/// same fingerprint attaches to the re-encode.
pub async fn download_export(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(export_id): Path<DbId>,
) -> AppResult<Response> {
    let export = ClipExportRepo::find_for_download(&state.pool, export_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClipExport",
            id: export_id,
        }))?;

    ensure_owner_or_admin(export.created_by, &auth, "download")?;

    if export.status_id != ExportStatus::Ready.id() {
        return Err(AppError::Core(CoreError::Conflict(
            "Export is not ready yet".into(),
        )));
    }

    let file = match export.file_path.as_deref() {
        None => return Err(artifact_gone(&state, export_id).await),
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(artifact_gone(&state, export_id).await);
            }
            Err(e) => {
                return Err(AppError::InternalError(format!(
                    "Failed to open export artifact: {e}"
                )));
            }
        },
    };

    let metadata = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to stat export artifact: {e}")))?;

    // Downloading counts as an access; the governor runs off-path.
    ClipExportRepo::touch_accessed(&state.pool, export_id).await?;
    let pool = state.pool.clone();
    tokio::spawn(async move {
        governor::run_pass(&pool).await;
    });

    let crop_segment: Option<&str> = if export.variant == VARIANT_FULL {
        None
    } else {
        Some(export.crop_name.as_deref().unwrap_or(""))
    };
    let filename = export_filename(&export.clip_title, crop_segment, export.id, &export.format);

    tracing::info!(
        export_id,
        user_id = auth.user_id,
        filename = %filename,
        "Export downloaded",
    );

    let stream = ReaderStream::new(file);
    Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(&export.format))
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(format!("Failed to build download response: {e}")))
}

/// Requeue a ready export whose artifact has vanished and report 410.
async fn artifact_gone(state: &AppState, export_id: DbId) -> AppError {
    if let Err(e) = ClipExportRepo::requeue(&state.pool, export_id).await {
        return AppError::Database(e);
    }
    crate::exports::notify_workers_best_effort(&state.pool, &export_id.to_string()).await;
    tracing::warn!(export_id, "Export artifact missing at download; requeued");
    AppError::Core(CoreError::Gone(
        "Export file is no longer available; the export has been requeued".into(),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/videos/{id}/bank-export-status
// ---------------------------------------------------------------------------

/// Rebuild the export badges for every clip of a video.
///
/// Streams one patch per clip that has an active or ready export, then
/// ends. Used by the front-end after the clip list is re-rendered.
pub async fn bank_export_status(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    VideoRepo::find_by_id(&state.pool, video_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Video",
            id: video_id,
        }))?;

    let clip_ids = ClipRepo::list_ids_by_video(&state.pool, video_id).await?;
    let patches = hydrate::hydrate_badges(&state.pool, &clip_ids).await?;

    let events = patches
        .into_iter()
        .map(|patch| Ok::<_, std::convert::Infallible>(sse_event(&patch)));

    Ok(Sse::new(futures::stream::iter(events)))
}
