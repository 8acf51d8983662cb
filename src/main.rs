//! Doorman DoH proxy - Entry point.
//!
//! This binary serves DNS-over-HTTPS queries, applies blocking rules,
//! caches upstream responses, and exposes admin endpoints for rule and
//! stats access.

use std::borrow::Cow;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use doorman::cache::MemoryCache;
use doorman::config::Config;
use doorman::dns::UpstreamResolver;
use doorman::filter::RuleStore;
use doorman::http;
use doorman::server::QueryHandler;
use doorman::stats::StatsTracker;

async fn run() -> Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed("doorman.toml"));
    let config = Config::load(config_path.as_ref()).context("Failed to load configuration")?;

    // Initialize metrics (must be done early, before any metrics are recorded)
    doorman::metrics::init(&config.metrics).context("Failed to initialize metrics")?;
    if config.metrics.enabled {
        info!("Metrics enabled on {}", config.metrics.listen);
    }

    info!("Starting Doorman DoH proxy...");
    info!("Primary upstream: {}", config.upstream.primary);
    if let Some(fallback) = &config.upstream.fallback {
        info!("Fallback upstream: {fallback}");
    }
    info!(
        "Cache: {} entries max, TTL {} seconds",
        config.cache.capacity, config.cache.ttl_secs
    );

    let rules = RuleStore::from_config(&config.rules)
        .await
        .context("Failed to load filtering rules")?;
    let loaded = rules.snapshot();
    info!(
        "Rules loaded: {} allowed, {} blocked, {} patterns",
        loaded.allow.len(),
        loaded.block.len(),
        loaded.patterns.len()
    );

    let cache = MemoryCache::new(config.cache.capacity);
    let resolver =
        UpstreamResolver::new(&config.upstream).context("Failed to build upstream client")?;
    let handler = QueryHandler::new(
        cache,
        resolver,
        rules,
        StatsTracker::new(),
        Duration::from_secs(config.cache.ttl_secs),
    );

    let app = http::router(handler);
    let listener = TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!("Listening on {}", config.server.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Ctrl-C received, shutting down...");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    run().await
}
