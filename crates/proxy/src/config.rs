use anyhow::{Context, Result};
use jsgate_common::AppConfig;
use std::path::PathBuf;
use tracing::info;

/// Resolved configuration with the path it was loaded from.
pub struct ProxyConfig {
    pub config: AppConfig,
    pub config_path: PathBuf,
}

impl ProxyConfig {
    pub fn load(path: &str) -> Result<Self> {
        info!(path = path, "loading configuration");
        let config = AppConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path))?;
        Ok(Self {
            config,
            config_path: PathBuf::from(path),
        })
    }
}
