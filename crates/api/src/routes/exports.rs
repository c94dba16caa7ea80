//! Route definitions for the export pipeline.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::exports;
use crate::state::AppState;

/// Routes mounted at `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clips/{id}/export", post(exports::start_export))
        .route("/clip-exports/{id}/status", get(exports::export_status))
        .route("/clip-exports/{id}/download", get(exports::download_export))
        .route(
            "/videos/{id}/bank-export-status",
            get(exports::bank_export_status),
        )
}
