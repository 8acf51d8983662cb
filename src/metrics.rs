//! Metrics initialization for the Prometheus exporter.

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;
use crate::error::Result;

/// Initialize the metrics system based on configuration.
///
/// When enabled, this starts an HTTP server exposing a `/metrics`
/// endpoint for Prometheus to scrape. The query pipeline records
/// `doorman_queries_total`, `doorman_blocked_total`,
/// `doorman_cache_hits_total`, `doorman_cache_misses_total`,
/// `doorman_upstream_fallbacks_total` and `doorman_upstream_errors_total`.
///
/// When disabled, this is a no-op and the recorded counters go nowhere.
pub fn init(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()
        .map_err(crate::error::Error::Metrics)?;

    Ok(())
}
