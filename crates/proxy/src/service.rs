use async_trait::async_trait;
use chrono::Utc;
use jsgate_admin::{DecisionLogEntry, SharedState};
use jsgate_gate::{GateDecision, GateResponse, RequestMetadata};
use pingora_core::prelude::*;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{ProxyHttp, Session};
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::upstream::UpstreamSelector;

/// Reverse proxy that runs the access gate before forwarding.
pub struct JsGateProxy {
    pub state: SharedState,
    pub upstreams: Vec<UpstreamSelector>,
}

impl JsGateProxy {
    pub fn new(state: SharedState) -> Self {
        let upstreams = {
            let config = state.config.read().expect("config lock poisoned");
            config
                .upstreams
                .iter()
                .map(UpstreamSelector::from_config)
                .collect()
        };
        Self { state, upstreams }
    }

    fn find_route(&self, host: Option<&str>, path: &str) -> Option<usize> {
        let config = self.state.config.read().expect("config lock poisoned");
        config.routes.iter().position(|route| {
            let host_match = match (&route.host, host) {
                (Some(route_host), Some(req_host)) => req_host == route_host.as_str(),
                (Some(_), None) => false,
                (None, _) => true, // wildcard host
            };
            host_match && path.starts_with(&route.path_prefix)
        })
    }

    /// Unmatched requests are gated too.
    fn route_is_gated(&self, route_index: Option<usize>) -> bool {
        let config = self.state.config.read().expect("config lock poisoned");
        route_index
            .and_then(|i| config.routes.get(i))
            .map_or(true, |r| r.gate)
    }

    fn find_upstream(&self, name: &str) -> Option<&UpstreamSelector> {
        self.upstreams.iter().find(|u| u.name == name)
    }
}

#[async_trait]
impl ProxyHttp for JsGateProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        self.state.metrics.requests_total.inc();

        let header = session.req_header();
        ctx.method = header.method.as_str().to_string();
        ctx.uri = header
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();
        let host = header
            .headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let path = header.uri.path().to_string();

        ctx.client_ip = client_ip(session);
        ctx.route_index = self.find_route(host.as_deref(), &path);

        let gate = self.state.gate.load_full();
        if !gate.config().enabled || !self.route_is_gated(ctx.route_index) {
            debug!(uri = %ctx.uri, "gate skipped");
            return Ok(false);
        }

        let headers = &session.req_header().headers;
        let decision = gate.check(headers);
        ctx.decision = Some(decision);
        self.state.metrics.record(&decision);
        self.state.push_decision(DecisionLogEntry {
            id: ctx.request_id.clone(),
            timestamp: Utc::now(),
            client_ip: ctx.client_ip.clone(),
            method: ctx.method.clone(),
            uri: ctx.uri.clone(),
            user_agent: headers.user_agent().unwrap_or_default().into_owned(),
            referer: headers.referer().map(|r| r.into_owned()),
            decision,
        });

        match decision {
            GateDecision::Allow => {
                debug!(client_ip = %ctx.client_ip, uri = %ctx.uri, "request allowed by gate");
            }
            GateDecision::Challenge => {
                info!(
                    client_ip = %ctx.client_ip,
                    uri = %ctx.uri,
                    request_id = %ctx.request_id,
                    "issuing cookie challenge"
                );
            }
            GateDecision::Deny { reason } => {
                info!(
                    client_ip = %ctx.client_ip,
                    uri = %ctx.uri,
                    request_id = %ctx.request_id,
                    reason = %reason,
                    "request denied by gate"
                );
            }
        }

        match gate.response_for(&decision) {
            Some(response) => {
                ctx.response_status = response.status.as_u16();
                write_gate_response(session, response).await?;
                Ok(true)
            }
            None => Ok(false), // continue to upstream
        }
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let upstream_name = {
            let config = self.state.config.read().expect("config lock poisoned");
            ctx.route_index
                .and_then(|i| config.routes.get(i))
                .or_else(|| config.routes.first())
                .map(|r| r.upstream.clone())
                .unwrap_or_else(|| "backend".to_string())
        };

        let addr = self
            .find_upstream(&upstream_name)
            .and_then(|u| u.select())
            .ok_or_else(|| Error::new(ErrorType::ConnectProxyFailure))?;

        debug!(upstream = %upstream_name, addr, "selected upstream peer");

        let peer = HttpPeer::new(addr, false, String::new());
        Ok(Box::new(peer))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        if !ctx.client_ip.is_empty() {
            upstream_request.insert_header("x-real-ip", &ctx.client_ip)?;
        }
        upstream_request.insert_header("x-request-id", &ctx.request_id)?;
        Ok(())
    }

    async fn response_filter(
        &self,
        _session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()>
    where
        Self::CTX: Send + Sync,
    {
        ctx.response_status = upstream_response.status.as_u16();
        Ok(())
    }

    async fn logging(
        &self,
        _session: &mut Session,
        _error: Option<&pingora_core::Error>,
        ctx: &mut Self::CTX,
    ) {
        let duration = ctx.request_start.elapsed();
        self.state
            .metrics
            .request_duration
            .with_label_values(&[ctx.outcome_label()])
            .observe(duration.as_secs_f64());

        info!(
            request_id = %ctx.request_id,
            client_ip = %ctx.client_ip,
            method = %ctx.method,
            uri = %ctx.uri,
            status = ctx.response_status,
            duration_ms = duration.as_millis() as u64,
            decision = ctx.outcome_label(),
            "request completed"
        );
    }
}

/// Send a gate response and end the request.
async fn write_gate_response(session: &mut Session, response: GateResponse) -> Result<()> {
    let mut resp = ResponseHeader::build(response.status, Some(response.headers.len() + 1))?;
    for (name, value) in response.headers {
        resp.insert_header(name, value)?;
    }
    resp.insert_header("content-length", response.body.len().to_string())?;

    session.set_keepalive(None);
    session.write_response_header(Box::new(resp), false).await?;
    session.write_response_body(Some(response.body), true).await?;
    Ok(())
}

/// Client IP from the first `X-Forwarded-For` hop, else the socket peer.
fn client_ip(session: &Session) -> String {
    session
        .req_header()
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(forwarded_client)
        .unwrap_or_else(|| {
            session
                .client_addr()
                .and_then(|a| a.as_inet())
                .map(|a| a.ip().to_string())
                .unwrap_or_default()
        })
}

fn forwarded_client(header: &str) -> Option<String> {
    header
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
