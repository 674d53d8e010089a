use axum::Json;
use axum::extract::State;
use serde::Serialize;

use galleria_gallery::MetricsSnapshot;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Registered viewer sessions.
    pub sessions: usize,
    /// Uploads between blob write and metadata insert.
    pub pending_uploads: usize,
    /// Blobs known to be missing a metadata row.
    pub known_orphans: usize,
    pub metrics: MetricsSnapshot,
}

/// `GET /health` -- service status with session counts and metrics.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let gallery = &state.gallery;
    Json(HealthResponse {
        status: "ok",
        sessions: gallery.hub().session_count(),
        pending_uploads: gallery.ledger().pending_count(),
        known_orphans: gallery.ledger().orphans().len(),
        metrics: gallery.metrics().snapshot(),
    })
}
