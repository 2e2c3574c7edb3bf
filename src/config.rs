//! Gateway configuration: TOML file, per-field defaults and `RELAYGATE_*`
//! environment overrides

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `upstream.url`
pub const ENV_UPSTREAM_URL: &str = "RELAYGATE_UPSTREAM_URL";
/// Environment variable overriding `upstream.timeout_secs`
pub const ENV_UPSTREAM_TIMEOUT_SECS: &str = "RELAYGATE_UPSTREAM_TIMEOUT_SECS";
/// Environment variable overriding `server.port`
pub const ENV_PORT: &str = "RELAYGATE_PORT";

/// Global configuration for the gateway
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream backend the gateway forwards to
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Path rewriting applied before forwarding and fallback matching
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Static fallback behaviour
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// HTTP port (default: 8080)
    #[serde(default = "default_listen_port")]
    pub port: u16,

    /// Bind address (default: 0.0.0.0)
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Largest request body read before answering from the fallback (default: 1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_listen_port(),
            bind: default_bind_address(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to; the normalized path is appended
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Upper bound for the whole upstream exchange, in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_secs: default_upstream_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    /// Platform routing prefixes stripped from inbound paths, first match wins
    #[serde(default = "default_strip_prefixes")]
    pub strip_prefixes: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strip_prefixes: default_strip_prefixes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    /// Include an RFC 3339 timestamp in the fallback health document
    #[serde(default = "default_true")]
    pub health_timestamp: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            health_timestamp: true,
        }
    }
}

// Default value functions
fn default_listen_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:5000/api".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_strip_prefixes() -> Vec<String> {
    vec!["/.netlify/functions/api".to_string(), "/api".to_string()]
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    ///
    /// Environment overrides and validation apply in both cases.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RELAYGATE_*` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            self.upstream.url = url;
        }
        if let Some(secs) = lookup(ENV_UPSTREAM_TIMEOUT_SECS) {
            self.upstream.timeout_secs = secs.trim().parse().map_err(|e| {
                anyhow::anyhow!("Invalid {}='{}': {}", ENV_UPSTREAM_TIMEOUT_SECS, secs, e)
            })?;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid {}='{}': {}", ENV_PORT, port, e))?;
        }
        Ok(())
    }

    /// Validate all configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut errors = Vec::new();

        let url = self.upstream.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "upstream.url must start with http:// or https:// (got '{}')",
                self.upstream.url
            ));
        }

        if self.server.max_body_bytes == 0 {
            errors.push("server.max_body_bytes must be greater than 0".to_string());
        }

        if self.upstream.timeout_secs == 0 {
            errors.push("upstream.timeout_secs must be greater than 0".to_string());
        }

        if self.upstream.connect_timeout_secs == 0 {
            errors.push("upstream.connect_timeout_secs must be greater than 0".to_string());
        }

        for prefix in &self.routing.strip_prefixes {
            if !prefix.starts_with('/') || prefix.len() < 2 {
                errors.push(format!(
                    "routing.strip_prefixes entry '{}' must start with '/' and name a segment",
                    prefix
                ));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration errors:\n  - {}", errors.join("\n  - "));
        }

        Ok(())
    }
}
