//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::errors::ServerError;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the `/metrics` endpoint. Fails if a
/// recorder is already installed in this process.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    tracing::info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants to avoid typos.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "uhr_ws_connections_total";
/// WebSocket disconnections total (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "uhr_ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "uhr_ws_connections_active";
/// Rejected or failed upgrades (counter, labels: reason).
pub const WS_UPGRADE_FAILURES_TOTAL: &str = "uhr_ws_upgrade_failures_total";
/// Replies written (counter, labels: leap).
pub const REPLIES_TOTAL: &str = "uhr_replies_total";
/// Discarded malformed requests (counter).
pub const MALFORMED_REQUESTS_TOTAL: &str = "uhr_malformed_requests_total";
/// Upstream time queries (counter, labels: origin).
pub const TIME_QUERIES_TOTAL: &str = "uhr_time_queries_total";
/// Upstream time query duration seconds (histogram).
pub const TIME_QUERY_DURATION_SECONDS: &str = "uhr_time_query_duration_seconds";
