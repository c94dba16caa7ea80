//! Liveness probe.

use axum::Json;

use crate::response::DataResponse;

/// GET /health
///
/// Always returns 200 while the process is serving requests.
pub async fn health() -> Json<DataResponse<&'static str>> {
    Json(DataResponse { data: "ok" })
}
