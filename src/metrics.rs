//! Prometheus metrics.
//!
//! Call sites use the thin helpers below; the recorder is installed once per
//! process by [`init`] and rendered on `GET /metrics`.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the global Prometheus recorder. Safe to call more than once;
/// later calls return the handle from the first.
pub fn init() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        })
        .clone()
}

/// Count a served request by endpoint and status code.
pub fn record_request(endpoint: &'static str, status: u16) {
    counter!("playlist_requests_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
}

/// Observe request latency since `start`.
pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("playlist_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Count an origin fetch by outcome (`downloaded`, `unchanged`, `refetch`).
pub fn record_origin_fetch(outcome: &'static str) {
    counter!("playlist_origin_fetches_total", "outcome" => outcome).increment(1);
}

/// Count a failed origin fetch.
pub fn record_origin_error() {
    counter!("playlist_origin_errors_total").increment(1);
}

/// Count a playlist cache lookup.
pub fn record_playlist_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("playlist_cache_lookups_total", "result" => result).increment(1);
}
