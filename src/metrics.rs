use crate::error::MonitorError;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Monitoring records handed to the sink, by event type
pub const EVENTS_TOTAL: &str = "llm_monitor_events_total";

/// Custom metrics handed to the sink, by metric name
pub const METRICS_TOTAL: &str = "llm_monitor_metrics_total";

/// Callback failures reported to the host's failure hook
pub const CALLBACK_FAILURES_TOTAL: &str = "llm_monitor_callback_failures_total";

/// Install a Prometheus recorder for this process
///
/// Fails if a global recorder is already installed (e.g. in tests).
pub fn init_metrics() -> Result<PrometheusHandle, MonitorError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MonitorError::InternalError(format!("Failed to install Prometheus recorder: {}", e)))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(EVENTS_TOTAL, "Total number of AI monitoring events recorded");
    describe_counter!(METRICS_TOTAL, "Total number of custom metrics recorded");
    describe_counter!(
        CALLBACK_FAILURES_TOTAL,
        "Total number of monitoring callback failures"
    );
    describe_gauge!("llm_monitor_info", "Monitor version information");

    gauge!("llm_monitor_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record an event handed to the sink
pub fn record_event(event_type: &str) {
    counter!(EVENTS_TOTAL, "event_type" => event_type.to_string()).increment(1);
}

/// Record a custom metric handed to the sink
pub fn record_metric(name: &str) {
    counter!(METRICS_TOTAL, "metric" => name.to_string()).increment(1);
}

/// Record a callback failure
pub fn record_callback_failure(callback: &str) {
    counter!(CALLBACK_FAILURES_TOTAL, "callback" => callback.to_string()).increment(1);
}
