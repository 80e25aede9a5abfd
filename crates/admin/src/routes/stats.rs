use axum::extract::State;
use axum::Json;
use jsgate_gate::DenyReason;
use serde::Serialize;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct GateStatsResponse {
    pub total_requests: u64,
    pub allowed: u64,
    pub challenges_issued: u64,
    pub denied: u64,
    pub denied_not_a_browser: u64,
    pub denied_invalid_referer: u64,
    /// Allowed requests per challenge issued. Browsers that complete the
    /// handshake push this towards 1; clients stuck in the challenge loop
    /// push it towards 0.
    pub challenge_pass_rate: f64,
    pub uptime_secs: u64,
}

/// GET /api/stats
pub async fn get_stats(State(state): State<SharedState>) -> Json<GateStatsResponse> {
    let metrics = &state.metrics;
    let denied = |reason: DenyReason| {
        metrics
            .denied_total
            .get_metric_with_label_values(&[reason.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    };

    let allowed = metrics.requests_allowed.get();
    let challenges_issued = metrics.challenges_issued.get();
    let challenge_pass_rate = if challenges_issued > 0 {
        (allowed as f64 / challenges_issued as f64).min(1.0)
    } else {
        0.0
    };

    Json(GateStatsResponse {
        total_requests: metrics.requests_total.get(),
        allowed,
        challenges_issued,
        denied: metrics.denied(),
        denied_not_a_browser: denied(DenyReason::NotABrowser),
        denied_invalid_referer: denied(DenyReason::InvalidReferer),
        challenge_pass_rate,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
