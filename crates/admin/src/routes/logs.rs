use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::SharedState;

/// Query parameters for the decision log endpoint.
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    /// Maximum number of entries to return (default: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Only entries with this decision label (`allow`, `challenge`, `deny`).
    pub decision: Option<String>,
    /// Only entries from this client IP.
    pub ip: Option<String>,
}

fn default_limit() -> usize {
    100
}

/// GET /api/logs
///
/// Returns the most recent gate decisions, newest first.
pub async fn get_logs(
    State(state): State<SharedState>,
    Query(params): Query<LogQuery>,
) -> Json<Value> {
    let log = state.decision_log.read().expect("decision_log lock poisoned");

    let entries: Vec<_> = log
        .iter()
        .rev()
        .filter(|entry| {
            params
                .decision
                .as_deref()
                .map_or(true, |d| entry.decision.label() == d)
                && params.ip.as_deref().map_or(true, |ip| entry.client_ip == ip)
        })
        .take(params.limit)
        .cloned()
        .collect();

    Json(json!({
        "count": entries.len(),
        "limit": params.limit,
        "entries": entries
    }))
}
