//! Configuration loading and validation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, Result, ValidationError};

/// Main configuration for the Doorman DoH proxy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Upstream DoH resolver endpoints.
    pub upstream: UpstreamConfig,

    /// Response cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Filtering rules.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Prometheus metrics exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the DoH endpoint listens on (e.g., "127.0.0.1:8053").
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub listen: SocketAddr,
}

/// Upstream DoH resolver endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Primary endpoint (e.g., "https://cloudflare-dns.com/dns-query").
    pub primary: String,

    /// Optional fallback endpoint, used only when the primary fails.
    pub fallback: Option<String>,

    /// Timeout for upstream requests in seconds.
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

/// Response cache sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached responses.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Cache TTL in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Rule sources: inline entries plus list files loaded at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Domains that are always allowed, including their subdomains.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Domains to block, including their subdomains.
    /// Supports exact entries ("example.com") and wildcards ("*.example.com").
    #[serde(default)]
    pub block: Vec<String>,

    /// Case-insensitive regular expressions, evaluated in order.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Files with one allowed domain per line.
    #[serde(default)]
    pub allow_files: Vec<PathBuf>,

    /// Files with one blocked domain per line.
    #[serde(default)]
    pub block_files: Vec<PathBuf>,

    /// Files with one pattern per line.
    #[serde(default)]
    pub pattern_files: Vec<PathBuf>,
}

/// Prometheus metrics exporter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// Address the exporter listens on.
    #[serde(
        default = "default_metrics_listen",
        deserialize_with = "deserialize_socket_addr"
    )]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

const fn default_upstream_timeout() -> u64 {
    5
}

const fn default_cache_capacity() -> usize {
    1000
}

const fn default_cache_ttl() -> u64 {
    300
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::Validation(ValidationError::ZeroCacheCapacity).into());
        }

        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Validation(ValidationError::ZeroCacheTtl).into());
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Validation(ValidationError::ZeroUpstreamTimeout).into());
        }

        if self.upstream.primary.is_empty() {
            return Err(ConfigError::Validation(ValidationError::EmptyPrimaryUrl).into());
        }

        for url in std::iter::once(&self.upstream.primary).chain(self.upstream.fallback.iter()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Validation(ValidationError::InvalidUpstreamUrl {
                    url: url.clone(),
                })
                .into());
            }
        }

        for (list, entries) in [
            ("allow", &self.rules.allow),
            ("block", &self.rules.block),
            ("patterns", &self.rules.patterns),
        ] {
            if entries.iter().any(|entry| entry.trim().is_empty()) {
                return Err(ConfigError::Validation(ValidationError::EmptyRuleEntry {
                    list: list.to_string(),
                })
                .into());
            }
        }

        Ok(())
    }
}
