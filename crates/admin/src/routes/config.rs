use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jsgate_common::GateConfig;
use serde_json::json;

use crate::state::SharedState;

/// GET /api/config
///
/// Returns the running configuration as JSON.
pub async fn get_config(State(state): State<SharedState>) -> impl IntoResponse {
    let config = state.config.read().expect("config lock poisoned");
    Json(serde_json::to_value(&*config).unwrap_or(json!({"error": "serialization failed"})))
}

/// PUT /api/config
///
/// Replaces the gate section of the configuration. The new allow-lists take
/// effect for the next request; an invalid body leaves the running gate as is.
pub async fn update_config(
    State(state): State<SharedState>,
    Json(new_gate): Json<GateConfig>,
) -> impl IntoResponse {
    if let Err(e) = state.replace_gate_config(new_gate) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": format!("validation failed: {}", e)
            })),
        );
    }

    tracing::info!("gate configuration updated via admin API");

    (
        StatusCode::OK,
        Json(json!({
            "status": "updated"
        })),
    )
}
