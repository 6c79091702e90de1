//! Sink backed by the process-wide `metrics` recorder and `tracing`
//!
//! Custom metrics become counters on whatever recorder the host installed;
//! events are written as structured log lines under the
//! `llm_monitor::events` target for a log shipper to pick up.

use super::{MonitoringSink, SinkError};
use crate::models::Attributes;

pub const EVENT_LOG_TARGET: &str = "llm_monitor::events";

#[derive(Debug, Clone, Copy)]
pub struct RecorderSink {
    enabled: bool,
}

impl RecorderSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MonitoringSink for RecorderSink {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn record_custom_event(&self, event_type: &str, attributes: &Attributes) -> Result<(), SinkError> {
        let attributes = serde_json::to_string(attributes)
            .map_err(|e| SinkError::Rejected(format!("unserializable attributes: {}", e)))?;

        tracing::info!(
            target: EVENT_LOG_TARGET,
            event_type,
            attributes = %attributes,
            "custom event"
        );
        Ok(())
    }

    fn record_custom_metric(&self, name: &str, value: f64) -> Result<(), SinkError> {
        if !value.is_finite() || value < 0.0 {
            return Err(SinkError::Rejected(format!(
                "counter {} cannot be incremented by {}",
                name, value
            )));
        }

        ::metrics::counter!(name.to_string()).increment(value.round() as u64);
        Ok(())
    }
}
