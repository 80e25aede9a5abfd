use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /api/health
///
/// Returns the current health status of the gate, including uptime and version.
pub async fn health_check(State(state): State<SharedState>) -> Json<Value> {
    let uptime = state.start_time.elapsed().as_secs();

    Json(json!({
        "status": "healthy",
        "uptime_secs": uptime,
        "started_at": state.started_at.to_rfc3339(),
        "gate_enabled": state.gate.load().config().enabled,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
