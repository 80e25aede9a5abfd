use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};

/// Upper bound on a single server's weight. The selector allocates one slot
/// per unit of weight.
pub const MAX_UPSTREAM_WEIGHT: u32 = 1000;

/// Top-level gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstreams: Vec<UpstreamConfig>,
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub gate: GateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: Vec<String>,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_admin_listen")]
    pub listen: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_admin_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub name: String,
    pub servers: Vec<UpstreamServer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamServer {
    pub addr: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    pub upstream: String,
    /// Whether requests on this route pass through the access gate.
    #[serde(default = "default_true")]
    pub gate: bool,
}

/// Allow-lists and response texts for the access gate.
///
/// Every field has a default, so an empty `gate:` block gives the stock
/// behaviour: browser-token UA check, `js_check=1` cookie challenge and the
/// two trusted referer hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Substrings (matched case-insensitively) that mark a User-Agent as a browser.
    #[serde(default = "default_browser_tokens")]
    pub browser_tokens: Vec<String>,
    /// Substrings (matched case-sensitively) a present Referer must contain.
    #[serde(default = "default_trusted_referers")]
    pub trusted_referers: Vec<String>,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_value")]
    pub cookie_value: String,
    #[serde(default)]
    pub challenge_header: ChallengeHeaderConfig,
    #[serde(default)]
    pub messages: DenyMessages,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            browser_tokens: default_browser_tokens(),
            trusted_referers: default_trusted_referers(),
            cookie_name: default_cookie_name(),
            cookie_value: default_cookie_value(),
            challenge_header: ChallengeHeaderConfig::default(),
            messages: DenyMessages::default(),
        }
    }
}

/// Marker header attached to every challenge response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeHeaderConfig {
    #[serde(default = "default_challenge_header_name")]
    pub name: String,
    #[serde(default = "default_challenge_header_value")]
    pub value: String,
}

impl Default for ChallengeHeaderConfig {
    fn default() -> Self {
        Self {
            name: default_challenge_header_name(),
            value: default_challenge_header_value(),
        }
    }
}

/// Plain-text bodies for the two denial outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyMessages {
    #[serde(default = "default_not_a_browser_message")]
    pub not_a_browser: String,
    #[serde(default = "default_invalid_referer_message")]
    pub invalid_referer: String,
}

impl Default for DenyMessages {
    fn default() -> Self {
        Self {
            not_a_browser: default_not_a_browser_message(),
            invalid_referer: default_invalid_referer_message(),
        }
    }
}

// Default value helpers
fn default_admin_listen() -> String {
    "127.0.0.1:9090".to_string()
}
fn default_true() -> bool {
    true
}
fn default_weight() -> u32 {
    1
}
fn default_path_prefix() -> String {
    "/".to_string()
}
fn default_browser_tokens() -> Vec<String> {
    [
        "Chrome", "Firefox", "Safari", "Edge", "Opera", "MSIE", "Trident", "Mozilla",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_trusted_referers() -> Vec<String> {
    vec!["awi.cuhk.edu.cn".to_string(), "10.26.4.101".to_string()]
}
fn default_cookie_name() -> String {
    "js_check".to_string()
}
fn default_cookie_value() -> String {
    "1".to_string()
}
fn default_challenge_header_name() -> String {
    "X-Protect".to_string()
}
fn default_challenge_header_value() -> String {
    "JS-Check".to_string()
}
fn default_not_a_browser_message() -> String {
    "Access denied. Please use a real web browser.".to_string()
}
fn default_invalid_referer_message() -> String {
    "Access denied. Invalid referer.".to_string()
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> GateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> GateResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> GateResult<()> {
        if self.server.listen.is_empty() {
            return Err(GateError::Config(
                "server.listen must have at least one address".into(),
            ));
        }

        for route in &self.routes {
            let upstream_exists = self.upstreams.iter().any(|u| u.name == route.upstream);
            if !upstream_exists {
                return Err(GateError::Config(format!(
                    "route references unknown upstream '{}' (host={:?}, path={})",
                    route.upstream, route.host, route.path_prefix
                )));
            }
        }

        for upstream in &self.upstreams {
            if upstream.servers.is_empty() {
                return Err(GateError::Config(format!(
                    "upstream '{}' has no servers",
                    upstream.name
                )));
            }
            if let Some(server) = upstream
                .servers
                .iter()
                .find(|s| s.weight > MAX_UPSTREAM_WEIGHT)
            {
                return Err(GateError::Config(format!(
                    "upstream '{}' server '{}' has weight {} (max {})",
                    upstream.name, server.addr, server.weight, MAX_UPSTREAM_WEIGHT
                )));
            }
        }

        self.gate.validate()
    }
}

impl GateConfig {
    /// Validate the allow-lists and challenge settings.
    pub fn validate(&self) -> GateResult<()> {
        if self.browser_tokens.is_empty() {
            return Err(GateError::Config(
                "gate.browser_tokens must not be empty".into(),
            ));
        }
        if self.browser_tokens.iter().any(|t| t.is_empty()) {
            return Err(GateError::Config(
                "gate.browser_tokens contains an empty token".into(),
            ));
        }
        // An empty entry would match every referer.
        if self.trusted_referers.iter().any(|r| r.is_empty()) {
            return Err(GateError::Config(
                "gate.trusted_referers contains an empty entry".into(),
            ));
        }

        if self.cookie_name.is_empty() {
            return Err(GateError::Config("gate.cookie_name must not be empty".into()));
        }
        if !is_cookie_safe(&self.cookie_name) {
            return Err(GateError::Config(format!(
                "gate.cookie_name '{}' contains characters not allowed in a cookie name",
                self.cookie_name
            )));
        }
        if self.cookie_value.is_empty() {
            return Err(GateError::Config("gate.cookie_value must not be empty".into()));
        }
        if !is_cookie_safe(&self.cookie_value) {
            return Err(GateError::Config(format!(
                "gate.cookie_value '{}' contains characters not allowed in a cookie value",
                self.cookie_value
            )));
        }

        if http::HeaderName::from_bytes(self.challenge_header.name.as_bytes()).is_err() {
            return Err(GateError::Config(format!(
                "gate.challenge_header.name '{}' is not a valid header name",
                self.challenge_header.name
            )));
        }
        if http::HeaderValue::from_str(&self.challenge_header.value).is_err() {
            return Err(GateError::Config(format!(
                "gate.challenge_header.value '{}' is not a valid header value",
                self.challenge_header.value
            )));
        }

        Ok(())
    }
}

/// The challenge script writes the cookie verbatim, so separators, quotes and
/// whitespace would corrupt either the cookie or the script literal.
fn is_cookie_safe(s: &str) -> bool {
    s.chars().all(|c| {
        c.is_ascii_graphic() && !matches!(c, ';' | '=' | ',' | '"' | '\\')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
server:
  listen: ["0.0.0.0:8080"]
upstreams:
  - name: backend
    servers:
      - addr: "127.0.0.1:3000"
routes:
  - path_prefix: /
    upstream: backend
"#;

    #[test]
    fn test_minimal_config_uses_gate_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert!(config.gate.enabled);
        assert_eq!(config.gate.cookie_name, "js_check");
        assert_eq!(config.gate.cookie_value, "1");
        assert_eq!(config.gate.browser_tokens.len(), 8);
        assert!(config.gate.browser_tokens.contains(&"Mozilla".to_string()));
        assert_eq!(
            config.gate.trusted_referers,
            vec!["awi.cuhk.edu.cn".to_string(), "10.26.4.101".to_string()]
        );
        assert_eq!(config.gate.challenge_header.name, "X-Protect");
        assert!(config.routes[0].gate);
        assert!(config.server.admin.enabled);
    }

    #[test]
    fn test_partial_gate_block_keeps_other_defaults() {
        let yaml = format!(
            "{}gate:\n  trusted_referers: [\"example.org\"]\n",
            MINIMAL
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.gate.trusted_referers, vec!["example.org".to_string()]);
        assert_eq!(config.gate.cookie_name, "js_check");
    }

    #[test]
    fn test_unknown_upstream_rejected() {
        let yaml = r#"
server:
  listen: ["0.0.0.0:8080"]
upstreams:
  - name: backend
    servers:
      - addr: "127.0.0.1:3000"
routes:
  - upstream: missing
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown upstream 'missing'"));
    }

    #[test]
    fn test_empty_listen_rejected() {
        let yaml = MINIMAL.replace(r#"["0.0.0.0:8080"]"#, "[]");
        assert!(matches!(
            AppConfig::from_yaml(&yaml),
            Err(GateError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_weight_rejected() {
        let yaml = MINIMAL.replace(
            r#"- addr: "127.0.0.1:3000""#,
            "- addr: \"127.0.0.1:3000\"\n        weight: 4294967295",
        );
        let err = AppConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("has weight 4294967295"));

        let yaml = MINIMAL.replace(
            r#"- addr: "127.0.0.1:3000""#,
            "- addr: \"127.0.0.1:3000\"\n        weight: 1000",
        );
        assert!(AppConfig::from_yaml(&yaml).is_ok());
    }

    #[test]
    fn test_gate_validation() {
        let mut gate = GateConfig::default();
        assert!(gate.validate().is_ok());

        gate.browser_tokens.clear();
        assert!(gate.validate().is_err());

        let mut gate = GateConfig::default();
        gate.trusted_referers.push(String::new());
        assert!(gate.validate().is_err());

        let mut gate = GateConfig::default();
        gate.cookie_name = "js check".into();
        assert!(gate.validate().is_err());

        let mut gate = GateConfig::default();
        gate.cookie_value = "1; path=/evil".into();
        assert!(gate.validate().is_err());

        let mut gate = GateConfig::default();
        gate.challenge_header.name = "X Protect".into();
        assert!(gate.validate().is_err());
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = AppConfig::from_yaml(include_str!("../../../config/jsgate.yaml")).unwrap();
        assert_eq!(config.gate, GateConfig::default());
        assert!(!config.routes[0].gate);
        assert!(config.routes[1].gate);
    }

    #[test]
    fn test_empty_trusted_referers_allowed() {
        let gate = GateConfig {
            trusted_referers: vec![],
            ..GateConfig::default()
        };
        assert!(gate.validate().is_ok());
    }
}
