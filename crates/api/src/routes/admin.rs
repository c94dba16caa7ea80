//! Route definitions for export administration.
//!
//! All endpoints require the admin role.

use axum::routing::post;
use axum::Router;

use crate::handlers::admin_exports;
use crate::state::AppState;

/// Routes mounted at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/exports/{id}/delete", post(admin_exports::delete_export))
        .route("/exports/{id}/requeue", post(admin_exports::requeue_export))
        .route(
            "/exports/requeue-errors",
            post(admin_exports::requeue_errors),
        )
        .route(
            "/exports/delete-by-status/{status}",
            post(admin_exports::delete_by_status),
        )
        .route("/exports/delete-all", post(admin_exports::delete_all))
}
