//! Integration tests for the export pipeline endpoints.
//!
//! Covers the status-code surface (400/401/403/404/409/410), artifact
//! reuse, the self-healing missing-file path, and badge hydration, all
//! through the full middleware stack.

mod common;

use axum::http::StatusCode;
use rewind_core::export_spec::{ExportRequest, ExportSpec};
use rewind_core::roles::{ROLE_ADMIN, ROLE_USER};
use rewind_db::models::clip::Clip;
use rewind_db::models::clip_export::{ClipExport, CreateClipExport};
use rewind_db::models::status::ExportStatus;
use rewind_db::repositories::ClipExportRepo;
use sqlx::PgPool;

/// Request body matching `plain_export_row` below.
fn plain_body() -> serde_json::Value {
    serde_json::json!({ "format": "mp4", "variant": "full", "filters": [] })
}

/// Seed an export row with the same fingerprint the dispatch path computes
/// for [`plain_body`].
async fn plain_export_row(pool: &PgPool, clip: &Clip, user_id: i64) -> ClipExport {
    let spec = ExportSpec::canonicalise(&serde_json::from_value::<ExportRequest>(plain_body()).unwrap())
        .unwrap();
    ClipExportRepo::create(
        pool,
        &CreateClipExport {
            clip_id: clip.id,
            created_by: user_id,
            format: spec.format,
            variant: spec.variant.as_str(),
            spec_blob: spec.spec_blob,
            spec_blob_hash: spec.spec_blob_hash,
            clip_updated_at: clip.updated_at,
        },
    )
    .await
    .unwrap()
}

async fn count_exports(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM clip_exports")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// POST /api/clips/{id}/export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn export_requires_auth(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = common::post_json(app, "/api/clips/1/export", None, plain_body()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn export_unknown_clip_returns_404(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response =
        common::post_json(app, "/api/clips/999999/export", Some(&token), plain_body()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn export_invalid_format_returns_400(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "format": "avi", "variant": "full" });
    let response = common::post_json(
        app,
        &format!("/api/clips/{}/export", clip.id),
        Some(&token),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn export_invalid_variant_returns_400(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "format": "mp4", "variant": "crop:" });
    let response = common::post_json(
        app,
        &format!("/api/clips/{}/export", clip.id),
        Some(&token),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn export_foreign_clip_returns_403(pool: PgPool) {
    let alice = common::seed_user(&pool, "alice", ROLE_USER).await;
    let bob = common::seed_user(&pool, "bob", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, alice.id).await;
    let token = common::token_for(bob.id, ROLE_USER);
    let app = common::build_test_app(pool);

    let response = common::post_json(
        app,
        &format!("/api/clips/{}/export", clip.id),
        Some(&token),
        plain_body(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// A cold export answers with an SSE stream whose first patch is the
/// queued state, and leaves exactly one queued row behind.
#[sqlx::test(migrations = "../db/migrations")]
async fn cold_export_streams_queued_patch(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool.clone());

    let response = common::post_json(
        app,
        &format!("/api/clips/{}/export", clip.id),
        Some(&token),
        plain_body(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let frame = common::first_frame(response).await;
    assert!(frame.contains("Queued…"), "frame: {frame}");
    assert!(frame.contains(&format!("clip-export-status-{}", clip.id)));

    assert_eq!(count_exports(&pool).await, 1);
}

/// Identical sequential requests share one pending row.
#[sqlx::test(migrations = "../db/migrations")]
async fn identical_requests_coalesce(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let token = common::token_for(user.id, ROLE_USER);

    for _ in 0..2 {
        let app = common::build_test_app(pool.clone());
        let response = common::post_json(
            app,
            &format!("/api/clips/{}/export", clip.id),
            Some(&token),
            plain_body(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        // Drop the stream (client disconnect); no store mutation happens.
    }

    assert_eq!(count_exports(&pool).await, 1);
}

/// A ready artifact with an intact file is served without a new row, and
/// the stream opens on the ready patch with the download URL.
#[sqlx::test(migrations = "../db/migrations")]
async fn export_reuses_ready_artifact(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let export = plain_export_row(&pool, &clip, user.id).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifact.mp4");
    std::fs::write(&path, b"encoded media").unwrap();
    ClipExportRepo::mark_ready(&pool, export.id, path.to_str().unwrap(), 13)
        .await
        .unwrap();

    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        &format!("/api/clips/{}/export", clip.id),
        Some(&token),
        plain_body(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let frame = common::first_frame(response).await;
    assert!(frame.contains("ready"), "frame: {frame}");
    assert!(frame.contains(&format!("/api/clip-exports/{}/download", export.id)));

    assert_eq!(count_exports(&pool).await, 1);
}

// ---------------------------------------------------------------------------
// GET /api/clip-exports/{id}/status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn status_unknown_export_returns_404(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response = common::get(app, "/api/clip-exports/999999/status", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn status_attaches_to_existing_export(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let export = plain_export_row(&pool, &clip, user.id).await;

    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/clip-exports/{}/status", export.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let frame = common::first_frame(response).await;
    assert!(frame.contains("Queued…"), "frame: {frame}");
}

// ---------------------------------------------------------------------------
// GET /api/clip-exports/{id}/download
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn download_unknown_export_returns_404(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response = common::get(app, "/api/clip-exports/999999/download", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn download_not_ready_returns_409(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let export = plain_export_row(&pool, &clip, user.id).await;

    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/clip-exports/{}/download", export.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn download_serves_attachment(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let export = plain_export_row(&pool, &clip, user.id).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifact.mp4");
    std::fs::write(&path, b"encoded media").unwrap();
    ClipExportRepo::mark_ready(&pool, export.id, path.to_str().unwrap(), 13)
        .await
        .unwrap();

    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/clip-exports/{}/download", export.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "video/mp4"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(
        disposition.contains(&format!("goal-replay-{}.mp4", export.id)),
        "disposition: {disposition}"
    );

    assert_eq!(common::body_string(response).await, "encoded media");
}

/// P6: a ready row whose file was externally removed answers 410, flips
/// back to queued, and the next identical request attaches to it.
#[sqlx::test(migrations = "../db/migrations")]
async fn download_missing_file_self_heals(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, user.id).await;
    let export = plain_export_row(&pool, &clip, user.id).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifact.mp4");
    std::fs::write(&path, b"encoded media").unwrap();
    ClipExportRepo::mark_ready(&pool, export.id, path.to_str().unwrap(), 13)
        .await
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool.clone());
    let response = common::get(
        app,
        &format!("/api/clip-exports/{}/download", export.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::GONE);
    let body = common::body_string(response).await;
    assert!(body.contains("requeued"), "body: {body}");

    let row = ClipExportRepo::find_by_id(&pool, export.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status_id, ExportStatus::Queued.id());
    assert_eq!(row.attempts, 2);
    assert!(row.file_path.is_none());

    // The next identical request attaches to the requeued row.
    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        &format!("/api/clips/{}/export", clip.id),
        Some(&token),
        plain_body(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let frame = common::first_frame(response).await;
    assert!(frame.contains("Queued…"), "frame: {frame}");
    assert_eq!(count_exports(&pool).await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn download_foreign_export_returns_403(pool: PgPool) {
    let alice = common::seed_user(&pool, "alice", ROLE_USER).await;
    let bob = common::seed_user(&pool, "bob", ROLE_USER).await;
    let (_video, clip) = common::seed_clip(&pool, alice.id).await;
    let export = plain_export_row(&pool, &clip, alice.id).await;

    let token = common::token_for(bob.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/clip-exports/{}/download", export.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Admins can download anyone's export.
#[sqlx::test(migrations = "../db/migrations")]
async fn admin_can_download_foreign_export(pool: PgPool) {
    let alice = common::seed_user(&pool, "alice", ROLE_USER).await;
    let admin = common::seed_user(&pool, "root", ROLE_ADMIN).await;
    let (_video, clip) = common::seed_clip(&pool, alice.id).await;
    let export = plain_export_row(&pool, &clip, alice.id).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifact.mp4");
    std::fs::write(&path, b"encoded media").unwrap();
    ClipExportRepo::mark_ready(&pool, export.id, path.to_str().unwrap(), 13)
        .await
        .unwrap();

    let token = common::token_for(admin.id, ROLE_ADMIN);
    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/clip-exports/{}/download", export.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// GET /api/videos/{id}/bank-export-status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn hydration_unknown_video_returns_404(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool);
    let response = common::get(app, "/api/videos/999999/bank-export-status", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Hydration streams one badge per clip and ends; running it twice yields
/// the same badge set.
#[sqlx::test(migrations = "../db/migrations")]
async fn hydration_emits_badges_and_is_idempotent(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (video, clip) = common::seed_clip(&pool, user.id).await;
    let export = plain_export_row(&pool, &clip, user.id).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifact.mp4");
    std::fs::write(&path, b"encoded media").unwrap();
    ClipExportRepo::mark_ready(&pool, export.id, path.to_str().unwrap(), 13)
        .await
        .unwrap();

    let token = common::token_for(user.id, ROLE_USER);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let app = common::build_test_app(pool.clone());
        let response = common::get(
            app,
            &format!("/api/videos/{}/bank-export-status", video.id),
            Some(&token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(common::body_string(response).await);
    }

    assert!(bodies[0].contains(&format!("clip-export-status-{}", clip.id)));
    assert!(bodies[0].contains(&format!("/api/clip-exports/{}/download", export.id)));
    assert_eq!(bodies[0], bodies[1]);
}

/// A ready badge whose artifact vanished is requeued and skipped.
#[sqlx::test(migrations = "../db/migrations")]
async fn hydration_self_heals_missing_artifacts(pool: PgPool) {
    let user = common::seed_user(&pool, "alice", ROLE_USER).await;
    let (video, clip) = common::seed_clip(&pool, user.id).await;
    let export = plain_export_row(&pool, &clip, user.id).await;
    ClipExportRepo::mark_ready(&pool, export.id, "/exports/vanished.mp4", 13)
        .await
        .unwrap();

    let token = common::token_for(user.id, ROLE_USER);
    let app = common::build_test_app(pool.clone());
    let response = common::get(
        app,
        &format!("/api/videos/{}/bank-export-status", video.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_string(response).await;
    assert!(!body.contains("download"), "body: {body}");

    let row = ClipExportRepo::find_by_id(&pool, export.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status_id, ExportStatus::Queued.id());
}
