use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use jsgate_admin::{build_router, new_shared_state, DecisionLogEntry, SharedState};
use jsgate_common::AppConfig;
use jsgate_gate::{DenyReason, GateDecision};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> SharedState {
    let config = AppConfig::from_yaml(
        r#"
server:
  listen: ["127.0.0.1:8080"]
upstreams:
  - name: backend
    servers:
      - addr: "127.0.0.1:3000"
routes:
  - upstream: backend
"#,
    )
    .unwrap();
    new_shared_state(config).unwrap()
}

async fn send(state: SharedState, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = build_router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(state: SharedState, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body) = send(state, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn log_entry(ip: &str, decision: GateDecision) -> DecisionLogEntry {
    DecisionLogEntry {
        id: format!("{}-{}", ip, decision.label()),
        timestamp: Utc::now(),
        client_ip: ip.into(),
        method: "GET".into(),
        uri: "/".into(),
        user_agent: "Mozilla/5.0".into(),
        referer: None,
        decision,
    }
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json(test_state(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["gate_enabled"], true);
}

#[tokio::test]
async fn test_stats_reflect_metrics() {
    let state = test_state();
    state.metrics.requests_total.inc_by(4);
    state.metrics.record(&GateDecision::Challenge);
    state.metrics.record(&GateDecision::Challenge);
    state.metrics.record(&GateDecision::Allow);
    state.metrics.record(&GateDecision::Deny {
        reason: DenyReason::NotABrowser,
    });

    let (status, body) = get_json(state, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_requests"], 4);
    assert_eq!(body["allowed"], 1);
    assert_eq!(body["challenges_issued"], 2);
    assert_eq!(body["denied"], 1);
    assert_eq!(body["denied_not_a_browser"], 1);
    assert_eq!(body["denied_invalid_referer"], 0);
    assert_eq!(body["challenge_pass_rate"], 0.5);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let state = test_state();
    state.metrics.record(&GateDecision::Deny {
        reason: DenyReason::InvalidReferer,
    });
    let req = Request::get("/api/metrics").body(Body::empty()).unwrap();
    let (status, body) = send(state, req).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("jsgate_denied_total{reason=\"invalid referer\"} 1"));
}

#[tokio::test]
async fn test_get_config() {
    let (status, body) = get_json(test_state(), "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gate"]["cookie_name"], "js_check");
    assert_eq!(body["gate"]["trusted_referers"][0], "awi.cuhk.edu.cn");
}

#[tokio::test]
async fn test_update_config_swaps_gate() {
    let state = test_state();
    let req = Request::put("/api/config")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "trusted_referers": ["example.org"] }).to_string(),
        ))
        .unwrap();
    let (status, _) = send(state.clone(), req).await;
    assert_eq!(status, StatusCode::OK);

    let gate = state.gate.load();
    assert_eq!(gate.config().trusted_referers, vec!["example.org".to_string()]);
    assert_eq!(gate.config().cookie_name, "js_check");
}

#[tokio::test]
async fn test_update_config_rejects_invalid() {
    let state = test_state();
    let req = Request::put("/api/config")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "cookie_name": "" }).to_string()))
        .unwrap();
    let (status, body) = send(state.clone(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(state.gate.load().config().cookie_name, "js_check");
}

#[tokio::test]
async fn test_logs_newest_first_with_filters() {
    let state = test_state();
    state.push_decision(log_entry("10.0.0.1", GateDecision::Challenge));
    state.push_decision(log_entry("10.0.0.2", GateDecision::Allow));
    state.push_decision(log_entry(
        "10.0.0.1",
        GateDecision::Deny {
            reason: DenyReason::InvalidReferer,
        },
    ));

    let (_, body) = get_json(state.clone(), "/api/logs").await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["entries"][0]["decision"], "deny");
    assert_eq!(body["entries"][0]["reason"], "invalid_referer");

    let (_, body) = get_json(state.clone(), "/api/logs?ip=10.0.0.1").await;
    assert_eq!(body["count"], 2);

    let (_, body) = get_json(state.clone(), "/api/logs?decision=allow").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"][0]["client_ip"], "10.0.0.2");

    let (_, body) = get_json(state, "/api/logs?limit=1").await;
    assert_eq!(body["count"], 1);
}
