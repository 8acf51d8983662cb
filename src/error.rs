//! Error types for the Doorman DoH proxy.

use std::io;

use thiserror::Error;

/// Main error type for Doorman operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cache.capacity must be greater than 0")]
    ZeroCacheCapacity,

    #[error("cache.ttl_secs must be greater than 0")]
    ZeroCacheTtl,

    #[error("upstream.timeout_secs must be greater than 0")]
    ZeroUpstreamTimeout,

    #[error("upstream.primary cannot be empty")]
    EmptyPrimaryUrl,

    #[error("upstream URL must start with http:// or https://: {url:?}")]
    InvalidUpstreamUrl { url: String },

    #[error("rules.{list} contains an empty entry")]
    EmptyRuleEntry { list: String },
}

/// Errors talking to an upstream DoH resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
