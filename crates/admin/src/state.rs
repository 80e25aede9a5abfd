use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use jsgate_common::{AppConfig, GateConfig, GateResult};
use jsgate_gate::{AccessGate, DenyReason, GateDecision};
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use serde::Serialize;

/// Shared state type alias used across all route handlers.
pub type SharedState = Arc<AppState>;

/// Number of gate decisions kept for `/api/logs`.
pub const DECISION_LOG_CAPACITY: usize = 1000;

/// State shared by the proxy and the admin API.
///
/// The proxy reads the current gate through [`AppState::gate`] on every
/// request; the admin API swaps in a new one when the configuration changes.
pub struct AppState {
    pub config: RwLock<AppConfig>,
    pub gate: ArcSwap<AccessGate>,
    pub metrics: GateMetrics,
    pub decision_log: RwLock<VecDeque<DecisionLogEntry>>,
    pub start_time: std::time::Instant,
    pub started_at: DateTime<Utc>,
}

/// Prometheus metrics for gate outcomes.
pub struct GateMetrics {
    pub registry: Registry,
    pub requests_total: IntCounter,
    pub requests_allowed: IntCounter,
    pub challenges_issued: IntCounter,
    pub denied_total: IntCounterVec,
    pub request_duration: HistogramVec,
}

/// One evaluated request, as shown by `/api/logs`.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub method: String,
    pub uri: String,
    pub user_agent: String,
    pub referer: Option<String>,
    #[serde(flatten)]
    pub decision: GateDecision,
}

impl GateMetrics {
    /// Create the counters and histogram and register them against a fresh
    /// Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounter::with_opts(Opts::new(
            "jsgate_requests_total",
            "Total number of requests seen by the proxy",
        ))
        .expect("failed to create requests_total counter");

        let requests_allowed = IntCounter::with_opts(Opts::new(
            "jsgate_requests_allowed",
            "Requests the gate let through",
        ))
        .expect("failed to create requests_allowed counter");

        let challenges_issued = IntCounter::with_opts(Opts::new(
            "jsgate_challenges_issued",
            "Cookie challenges sent to clients",
        ))
        .expect("failed to create challenges_issued counter");

        let denied_total = IntCounterVec::new(
            Opts::new("jsgate_denied_total", "Requests denied by the gate"),
            &["reason"],
        )
        .expect("failed to create denied_total counter");

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "jsgate_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["decision"],
        )
        .expect("failed to create request_duration histogram");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("failed to register requests_total");
        registry
            .register(Box::new(requests_allowed.clone()))
            .expect("failed to register requests_allowed");
        registry
            .register(Box::new(challenges_issued.clone()))
            .expect("failed to register challenges_issued");
        registry
            .register(Box::new(denied_total.clone()))
            .expect("failed to register denied_total");
        registry
            .register(Box::new(request_duration.clone()))
            .expect("failed to register request_duration");

        Self {
            registry,
            requests_total,
            requests_allowed,
            challenges_issued,
            denied_total,
            request_duration,
        }
    }

    /// Count one gate outcome.
    pub fn record(&self, decision: &GateDecision) {
        match decision {
            GateDecision::Allow => self.requests_allowed.inc(),
            GateDecision::Challenge => self.challenges_issued.inc(),
            GateDecision::Deny { reason } => {
                self.denied_total.with_label_values(&[reason.as_str()]).inc()
            }
        }
    }

    /// Total denials across all reasons.
    pub fn denied(&self) -> u64 {
        DenyReason::ALL
            .iter()
            .filter_map(|r| self.denied_total.get_metric_with_label_values(&[r.as_str()]).ok())
            .map(|c| c.get())
            .sum()
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Create state from a validated configuration.
    pub fn new(config: AppConfig) -> GateResult<Self> {
        let gate = AccessGate::new(config.gate.clone())?;
        Ok(Self {
            config: RwLock::new(config),
            gate: ArcSwap::from_pointee(gate),
            metrics: GateMetrics::new(),
            decision_log: RwLock::new(VecDeque::with_capacity(DECISION_LOG_CAPACITY)),
            start_time: std::time::Instant::now(),
            started_at: Utc::now(),
        })
    }

    /// Validate and install a new gate configuration. On error the running
    /// gate is left untouched.
    pub fn replace_gate_config(&self, gate_config: GateConfig) -> GateResult<()> {
        let gate = AccessGate::new(gate_config.clone())?;
        // Both writes happen under the lock so concurrent updates cannot leave
        // the stored config and the live gate disagreeing.
        let mut config = self.config.write().expect("config lock poisoned");
        config.gate = gate_config;
        self.gate.store(Arc::new(gate));
        Ok(())
    }

    /// Append to the decision log, evicting the oldest entry when full.
    pub fn push_decision(&self, entry: DecisionLogEntry) {
        let mut log = self.decision_log.write().expect("decision_log lock poisoned");
        if log.len() >= DECISION_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(entry);
    }
}
