//! Prometheus metrics: recorder setup and the series this server exports.

use std::{sync::OnceLock, time::Duration};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const DATABASE_ERRORS_TOTAL: &str = "database_errors_total";
pub const ACTIVE_WEBSOCKETS: &str = "active_websockets";

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the process-wide Prometheus recorder and return its handle.
///
/// Only the first call installs; later calls get the same handle. If some
/// other recorder was installed first, the handle renders an empty page.
pub fn install_recorder() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
                    LATENCY_BUCKETS,
                )
                .unwrap_or_else(|e| {
                    tracing::warn!("latency buckets rejected, using summaries: {}", e);
                    PrometheusBuilder::new()
                });
            let recorder = builder.build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!("metrics recorder not installed: {}", e);
            }
            handle
        })
        .clone()
}

/// One finished HTTP request, labelled by method, matched route and status
pub fn record_http_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "route" => route.to_string(),
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_database_error() {
    counter!(DATABASE_ERRORS_TOTAL).increment(1);
}

pub fn set_active_websockets(count: usize) {
    gauge!(ACTIVE_WEBSOCKETS).set(count as f64);
}
