use crate::server::state::AppState;
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// Liveness probe with build and cache information
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build": state.build,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "cached_entries": state.store.len(),
    }))
}
