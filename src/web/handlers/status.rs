// GET / and GET /api/status.
//
// /api/status combines the live MonitorStatus (running, last outcome) with
// the seen-set size so a dashboard can show both in one round-trip.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use crate::web::AppState;

/// Liveness check. Always 200 OK.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.status.read().await.clone();

    // seen_count is null when the store cannot be read.
    let seen_count = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Failed to count seen showings");
            None
        }
    };

    Json(serde_json::json!({
        "status": "ok",
        "monitor": status,
        "seen_count": seen_count,
    }))
}
