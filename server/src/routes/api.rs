use axum::Json;
use axum::extract::State;

use crate::state::AppState;

/// Liveness of the host itself; never touches the backend.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.backend_url.as_ref(),
        "observability": {
            "proxied_requests_total": observability.proxied_requests_total,
            "upstream_errors_total": observability.upstream_errors_total,
            "feed_streams_opened_total": observability.feed_streams_opened_total,
        }
    }))
}
