//! Prometheus metrics for addon observability.
//!
//! Metrics are exposed by the Prometheus exporter on its own port
//! (`METRICS_PORT`, disabled when 0). Recording without an installed
//! exporter is a no-op.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `stremio_http_requests_total` - Finished requests (labels: endpoint, status)
//!
//! ## Histograms
//! - `stremio_http_request_duration_seconds` - Request duration (labels: endpoint)
//!
//! # Endpoint Labels
//!
//! `root`, `manifest`, `manifest-data`, `catalog`, `catalog-data`, `stream`,
//! `stream-data`, `subtitles`, `configure`, `configure-other`, `health`,
//! `metrics` and `other`. The `-data` variants are requests carrying user
//! data in the path.

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "stremio_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "stremio_http_request_duration_seconds";
}

/// Initialize the Prometheus metrics exporter.
///
/// # Errors
///
/// Returns a message if the exporter can't be installed (port in use, or a
/// recorder is already installed).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::HTTP_REQUESTS_TOTAL,
        "Total number of handled HTTP requests"
    );
    describe_histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Endpoint label for a request path.
pub fn classify_endpoint(path: &str) -> &'static str {
    match path {
        "/" => return "root",
        "/manifest.json" => return "manifest",
        "/configure" => return "configure",
        "/health" => return "health",
        "/metrics" => return "metrics",
        "/subtitles" => return "subtitles",
        _ => {}
    }

    if path.starts_with("/catalog/") {
        "catalog"
    } else if path.starts_with("/stream/") {
        "stream"
    } else if path.starts_with("/configure") {
        "configure-other"
    } else if path.ends_with("/manifest.json") {
        "manifest-data"
    } else if is_data_path(path, "catalog/") {
        "catalog-data"
    } else if is_data_path(path, "stream/") {
        "stream-data"
    } else {
        "other"
    }
}

/// `/{userData}/<kind>/...json`
fn is_data_path(path: &str, kind: &str) -> bool {
    path.strip_prefix('/')
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(_, rest)| rest.starts_with(kind) && path.ends_with(".json"))
}

/// Record a finished HTTP request.
pub fn record_request(endpoint: &'static str, status: u16, duration_secs: f64) {
    counter!(names::HTTP_REQUESTS_TOTAL, "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, "endpoint" => endpoint).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_fixed_paths() {
        assert_eq!(classify_endpoint("/"), "root");
        assert_eq!(classify_endpoint("/manifest.json"), "manifest");
        assert_eq!(classify_endpoint("/configure"), "configure");
        assert_eq!(classify_endpoint("/configure.json"), "configure-other");
        assert_eq!(classify_endpoint("/health"), "health");
        assert_eq!(classify_endpoint("/subtitles"), "subtitles");
    }

    #[test]
    fn test_classify_resource_paths() {
        assert_eq!(classify_endpoint("/catalog/movie/top.json"), "catalog");
        assert_eq!(classify_endpoint("/stream/movie/tt1.json"), "stream");
        assert_eq!(classify_endpoint("/abc/manifest.json"), "manifest-data");
        assert_eq!(classify_endpoint("/abc/catalog/movie/top.json"), "catalog-data");
        assert_eq!(classify_endpoint("/abc/stream/movie/tt1.json"), "stream-data");
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(classify_endpoint("/favicon.ico"), "other");
        assert_eq!(classify_endpoint("/abc/stream/movie/tt1"), "other");
        assert_eq!(classify_endpoint(""), "other");
    }

    #[test]
    fn test_record_request_without_exporter() {
        // No-op without an installed recorder
        record_request("stream", 200, 0.01);
        record_request("other", 404, 0.002);
    }

    #[test]
    fn test_record_request_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("stream", 304, 0.01);
            record_request("stream", 304, 0.02);
        });

        let rendered = handle.render();
        assert!(
            rendered
                .lines()
                .any(|line| line.starts_with(names::HTTP_REQUESTS_TOTAL)
                    && line.contains("endpoint=\"stream\"")
                    && line.contains("status=\"304\"")
                    && line.ends_with(" 2")),
            "{rendered}"
        );
    }
}
