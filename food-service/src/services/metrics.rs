//! Prometheus exporter and the service's domain counters.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))
    })?;

    METRICS_HANDLE.set(handle).map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("Metrics recorder already initialized"))
    })
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_detection(mode: &'static str, outcome: &'static str, foods: usize) {
    metrics::counter!("food_detections_total", "mode" => mode, "outcome" => outcome).increment(1);
    metrics::histogram!("food_detection_results", "mode" => mode).record(foods as f64);
}

pub fn record_nutrition_entry() {
    metrics::counter!("nutrition_entries_created_total").increment(1);
}

pub fn record_openfoodfacts_request(outcome: &'static str) {
    metrics::counter!("openfoodfacts_requests_total", "outcome" => outcome).increment(1);
}
