//! Configuration management
//!
//! Layers, later wins: built-in defaults, YAML file, `APISIX_MCP_*`
//! environment (`__` separates nesting levels), then the legacy
//! `APISIX_*` variables existing deployments already set.

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "APISIX_MCP_";

/// Legacy variables and the config key each one sets
const LEGACY_ENV: &[(&str, &str)] = &[
    ("APISIX_SERVER_HOST", "admin.host"),
    ("APISIX_SERVER_PORT", "gateway.port"),
    ("APISIX_ADMIN_API_PORT", "admin.port"),
    ("APISIX_ADMIN_API_PREFIX", "admin.prefix"),
    ("APISIX_ADMIN_KEY", "admin.api_key"),
];

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before the environment layers are read.
    /// Paths support ~ expansion. Loaded in order; variables already set win.
    pub env_files: Vec<String>,
    /// Admin API connection
    pub admin: AdminConfig,
    /// Data-plane gateway used by `send_request_to_gateway`
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // env_files come from the file alone, so they can feed the env layers
        let bootstrap: Self = file_figment(path)?
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        load_env_files(&bootstrap.env_files);

        Self::load_with(path, |name| env::var(name).ok())
    }

    /// Load with an explicit lookup for the legacy variables
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be parsed.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut figment = file_figment(path)?;

        for (var, key) in LEGACY_ENV {
            let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            figment = if key.ends_with(".port") {
                let port: u16 = value.trim().parse().map_err(|_| {
                    Error::Config(format!("{var} must be a port number, got '{value}'"))
                })?;
                figment.merge(Serialized::default(key, port))
            } else {
                figment.merge(Serialized::default(key, value))
            };
        }

        // Prefixed variables win over the legacy ones
        let mut config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.admin.prefix = normalize_prefix(&config.admin.prefix);
        Ok(config)
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_overrides(
        mut self,
        admin_url: Option<String>,
        admin_key: Option<String>,
        gateway_url: Option<String>,
    ) -> Self {
        if admin_url.is_some() {
            self.admin.url = admin_url;
        }
        if let Some(key) = admin_key {
            self.admin.api_key = key;
        }
        if let Some(url) = gateway_url {
            self.gateway.url = url;
        }
        self
    }
}

fn file_figment(path: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(p) = path {
        if !p.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        figment = figment.merge(Yaml::file(p));
    }
    Ok(figment)
}

/// Load environment files into the process environment.
/// Supports ~ expansion. Files that don't exist are silently skipped.
fn load_env_files(paths: &[String]) {
    for path_str in paths {
        let expanded = match (path_str.strip_prefix('~'), dirs::home_dir()) {
            (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
            _ => path_str.clone(),
        };

        let path = Path::new(&expanded);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
            }
        } else {
            tracing::debug!("Env file not found (skipped): {expanded}");
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Admin API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Scheme and host of the control plane
    pub host: String,
    /// Admin API port
    pub port: u16,
    /// Path prefix of the Admin API
    pub prefix: String,
    /// Full base URL; overrides host/port/prefix when set
    pub url: Option<String>,
    /// Credential sent as `X-API-KEY`; `env:VAR` reads it from the environment
    pub api_key: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1".to_string(),
            port: 9180,
            prefix: "/apisix/admin".to_string(),
            url: None,
            api_key: "edd1c9f034335f136f87ad84b625c8f1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl AdminConfig {
    /// `{host}:{port}{prefix}`, or `url` when set
    #[must_use]
    pub fn base_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.trim_end_matches('/').to_string();
        }
        let host = self.host.trim_end_matches('/');
        let host = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        format!("{host}:{}{}", self.port, normalize_prefix(&self.prefix))
    }

    /// Resolve the credential, following `env:VAR` indirection
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced variable is not set.
    pub fn resolve_api_key(&self) -> Result<Option<String>> {
        self.resolve_api_key_with(|name| env::var(name).ok())
    }

    /// [`Self::resolve_api_key`] with an explicit lookup
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced variable is not set.
    pub fn resolve_api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Ok(None);
        }
        if let Some(var) = key.strip_prefix("env:") {
            return lookup(var)
                .map(Some)
                .ok_or_else(|| Error::Config(format!("Admin key variable {var} is not set")));
        }
        Ok(Some(key.to_string()))
    }
}

/// Data-plane gateway connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL; overrides `host`/`port` when set
    pub url: String,
    /// Data-plane port, used when `url` is built from the admin host
    pub port: Option<u16>,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Most attempts one batch may expand to, summed over `repeatCount`
    pub max_attempts: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9080".to_string(),
            port: None,
            timeout: Duration::from_secs(30),
            max_attempts: crate::batch::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl GatewayConfig {
    /// Effective base URL.
    ///
    /// A bare `port` (legacy `APISIX_SERVER_PORT`) re-targets the admin host.
    #[must_use]
    pub fn base_url(&self, admin: &AdminConfig) -> String {
        match self.port {
            Some(port) if self.url == Self::default().url => {
                let host = admin.host.trim_end_matches('/');
                if host.contains("://") {
                    format!("{host}:{port}")
                } else {
                    format!("http://{host}:{port}")
                }
            }
            _ => self.url.trim_end_matches('/').to_string(),
        }
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s", "250ms")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.trim();

        // "ms" before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            let mins = mins.trim().parse::<u64>().map_err(serde::de::Error::custom)?;
            mins.checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| serde::de::Error::custom(format!("duration too large: {s}")))
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
