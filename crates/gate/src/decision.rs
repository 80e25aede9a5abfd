use std::fmt;

use serde::Serialize;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotABrowser,
    InvalidReferer,
}

impl DenyReason {
    pub const ALL: [DenyReason; 2] = [DenyReason::NotABrowser, DenyReason::InvalidReferer];

    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotABrowser => "not a browser",
            DenyReason::InvalidReferer => "invalid referer",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Continue to the protected application.
    Allow,
    /// Answer with the cookie-setting script; the client is expected to retry.
    Challenge,
    /// Refuse the request.
    Deny { reason: DenyReason },
}

impl GateDecision {
    /// Whether the host must stop processing and send the gate's response.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GateDecision::Allow)
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GateDecision::Allow => "allow",
            GateDecision::Challenge => "challenge",
            GateDecision::Deny { .. } => "deny",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Deny { reason } => write!(f, "deny ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}
