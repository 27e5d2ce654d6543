//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint body.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::inference::{InferenceError, Label};

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder.
///
/// Only the first call installs a recorder; later calls are no-ops so tests
/// can call it freely.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    });
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_prediction(label: Label) {
    metrics::counter!("predictions_total", "label" => label.as_str()).increment(1);
}

pub fn record_prediction_error(err: &InferenceError) {
    metrics::counter!("prediction_errors_total", "kind" => err.kind()).increment(1);
}

pub fn record_request_failure(kind: &'static str) {
    metrics::counter!("prediction_errors_total", "kind" => kind).increment(1);
}
