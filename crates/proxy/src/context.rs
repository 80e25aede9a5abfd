use jsgate_gate::GateDecision;
use std::time::Instant;

/// Per-request context carried through the Pingora proxy pipeline.
pub struct RequestContext {
    /// Random id, forwarded upstream as `x-request-id`.
    pub request_id: String,

    /// Matched route index (into the config's routes vec).
    pub route_index: Option<usize>,

    /// Client IP address string.
    pub client_ip: String,

    /// Request start time for latency measurement.
    pub request_start: Instant,

    /// Gate outcome; `None` when the route is not gated.
    pub decision: Option<GateDecision>,

    /// HTTP method (cached for logging).
    pub method: String,

    /// Request URI (cached for logging).
    pub uri: String,

    /// Response status code, from the gate or the upstream.
    pub response_status: u16,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            route_index: None,
            client_ip: String::new(),
            request_start: Instant::now(),
            decision: None,
            method: String::new(),
            uri: String::new(),
            response_status: 0,
        }
    }

    /// Label used for the duration histogram.
    pub fn outcome_label(&self) -> &'static str {
        self.decision.map(|d| d.label()).unwrap_or("ungated")
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
