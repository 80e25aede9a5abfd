mod config;
mod context;
mod service;
mod upstream;

use anyhow::Result;
use pingora_core::server::Server;
use pingora_proxy::http_proxy_service;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ProxyConfig;
use crate::service::JsGateProxy;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/jsgate.yaml".to_string());

    info!(config_path = %config_path, "starting jsgate");

    let proxy_config = ProxyConfig::load(&config_path)?;
    let app_config = proxy_config.config.clone();

    let state = jsgate_admin::new_shared_state(app_config.clone())?;
    info!(
        enabled = app_config.gate.enabled,
        browser_tokens = app_config.gate.browser_tokens.len(),
        trusted_referers = ?app_config.gate.trusted_referers,
        cookie = %app_config.gate.cookie_name,
        path = %proxy_config.config_path.display(),
        "access gate configured"
    );

    let mut server = Server::new(None)?;
    server.bootstrap();

    let mut proxy_service =
        http_proxy_service(&server.configuration, JsGateProxy::new(state.clone()));

    for listen_addr in &app_config.server.listen {
        info!(addr = %listen_addr, "adding listener");
        proxy_service.add_tcp(listen_addr);
    }

    server.add_service(proxy_service);

    if app_config.server.admin.enabled {
        server.add_service(pingora_core::services::background::background_service(
            "admin API",
            AdminBackgroundService {
                listen_addr: app_config.server.admin.listen.clone(),
                state,
            },
        ));
    }

    info!("jsgate started");
    server.run_forever();
}

/// Background service to run the admin API alongside Pingora.
struct AdminBackgroundService {
    listen_addr: String,
    state: jsgate_admin::SharedState,
}

#[async_trait::async_trait]
impl pingora_core::services::background::BackgroundService for AdminBackgroundService {
    async fn start(&self, mut shutdown: pingora_core::server::ShutdownWatch) {
        info!(addr = %self.listen_addr, "starting admin API");

        tokio::select! {
            result = jsgate_admin::run_admin_server(self.state.clone(), &self.listen_addr) => {
                if let Err(e) = result {
                    error!(error = %e, "admin API server error");
                }
            }
            _ = shutdown.changed() => {
                info!("admin API shutting down");
            }
        }
    }
}
