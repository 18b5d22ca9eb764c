use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("failed to install prometheus recorder: {0}")]
    PrometheusInstall(String),
    #[error("failed to install tracing subscriber: {0}")]
    TracingInstall(String),
}

/// Install the process-wide `tracing` subscriber. JSON output in production,
/// pretty output otherwise, both gated by `RUST_LOG` via `EnvFilter` — same
/// shape the teacher's binaries use for their own startup logging.
pub fn init_tracing(json: bool) -> Result<(), ObservabilityError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);

    let result = if json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| ObservabilityError::TracingInstall(e.to_string()))
}

/// Install the Prometheus recorder and start its HTTP exporter on `addr`
/// (spec §4.13's counters/histograms/gauges need somewhere to be scraped
/// from). Returns before the exporter's background task is necessarily
/// ready to accept connections; callers do not need to await readiness.
pub fn init_metrics(addr: SocketAddr) -> Result<(), ObservabilityError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ObservabilityError::PrometheusInstall(e.to_string()))
}
