pub mod browser;
pub mod challenge;
pub mod context;
pub mod decision;
pub mod referer;
pub mod response;

use http::{HeaderName, HeaderValue, StatusCode};
use jsgate_common::{GateConfig, GateError, GateResult};
use tracing::debug;

pub use context::{InboundRequestContext, RequestMetadata};
pub use decision::{DenyReason, GateDecision};
pub use response::GateResponse;

/// Request-time access gate.
///
/// Holds only immutable, pre-processed configuration; [`AccessGate::evaluate`]
/// is a pure function of its input and safe to call from any number of
/// threads at once.
#[derive(Debug, Clone)]
pub struct AccessGate {
    config: GateConfig,
    browser_tokens: Vec<String>,
    challenge_marker: (HeaderName, HeaderValue),
    challenge_script: String,
}

impl AccessGate {
    /// Build a gate from configuration, validating it first.
    pub fn new(config: GateConfig) -> GateResult<Self> {
        config.validate()?;

        let name = HeaderName::from_bytes(config.challenge_header.name.as_bytes())
            .map_err(|e| GateError::Config(format!("challenge header name: {}", e)))?;
        let value = HeaderValue::from_str(&config.challenge_header.value)
            .map_err(|e| GateError::Config(format!("challenge header value: {}", e)))?;

        Ok(Self {
            browser_tokens: browser::normalize_tokens(&config.browser_tokens),
            challenge_marker: (name, value),
            challenge_script: challenge::challenge_script(
                &config.cookie_name,
                &config.cookie_value,
            ),
            config,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decide what to do with a request. First matching rule wins:
    ///
    /// 1. UA names no browser: deny.
    /// 2. Challenge cookie missing or wrong: challenge.
    /// 3. Referer present but untrusted: deny.
    /// 4. Otherwise allow.
    ///
    /// The referer is only consulted once the client has passed the
    /// challenge, so a browser with a bad referer is challenged first.
    pub fn evaluate(&self, ctx: &InboundRequestContext) -> GateDecision {
        if !browser::is_browser(&ctx.user_agent, &self.browser_tokens) {
            return GateDecision::Deny {
                reason: DenyReason::NotABrowser,
            };
        }

        if !ctx.has_challenge_cookie {
            return GateDecision::Challenge;
        }

        if !referer::is_trusted_referer(ctx.referer.as_deref(), &self.config.trusted_referers) {
            return GateDecision::Deny {
                reason: DenyReason::InvalidReferer,
            };
        }

        GateDecision::Allow
    }

    /// Build the request context from host-provided metadata.
    ///
    /// A missing UA is empty. Non-UTF-8 header bytes are replaced, never
    /// dropped, so a present referer is always classified and one odd cookie
    /// pair does not hide the challenge cookie next to it.
    pub fn context_from<M: RequestMetadata + ?Sized>(&self, meta: &M) -> InboundRequestContext {
        let cookie_headers = meta.cookie_headers();
        let has_challenge_cookie = challenge::has_challenge_cookie(
            cookie_headers.iter().map(|h| h.as_ref()),
            &self.config.cookie_name,
            &self.config.cookie_value,
        );
        InboundRequestContext {
            user_agent: meta.user_agent().unwrap_or_default().into_owned(),
            referer: meta.referer().map(|r| r.into_owned()),
            has_challenge_cookie,
        }
    }

    /// Build the context and evaluate it in one step.
    pub fn check<M: RequestMetadata + ?Sized>(&self, meta: &M) -> GateDecision {
        let ctx = self.context_from(meta);
        let decision = self.evaluate(&ctx);
        debug!(
            user_agent = %ctx.user_agent,
            referer = ?ctx.referer,
            has_cookie = ctx.has_challenge_cookie,
            decision = %decision,
            "access gate evaluated"
        );
        decision
    }

    /// Map a decision to the response the host must send.
    ///
    /// Returns `None` for [`GateDecision::Allow`]: the gate emits nothing and
    /// the request continues downstream.
    pub fn response_for(&self, decision: &GateDecision) -> Option<GateResponse> {
        match decision {
            GateDecision::Allow => None,
            GateDecision::Challenge => Some(GateResponse::challenge(
                self.challenge_marker.clone(),
                self.challenge_script.clone(),
            )),
            GateDecision::Deny { reason } => {
                let message = match reason {
                    DenyReason::NotABrowser => &self.config.messages.not_a_browser,
                    DenyReason::InvalidReferer => &self.config.messages.invalid_referer,
                };
                Some(GateResponse::text(StatusCode::FORBIDDEN, message))
            }
        }
    }
}
