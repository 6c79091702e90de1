//! Monitoring sink boundary
//!
//! The monitoring backend is an external collaborator reached through
//! [`MonitoringSink`]. [`SinkAdapter`] is the only caller: it skips records
//! while the sink reports itself disabled and turns sink errors into a log
//! line plus a call to the host's [`FailureHook`].

pub mod memory;
pub mod recorder;

pub use memory::{MemorySink, RecordedEvent, RecordedMetric, RecordingFailureHook};
pub use recorder::RecorderSink;

use crate::models::Attributes;
use std::fmt;
use std::sync::Arc;

/// Callback name reported to the failure hook
pub const CALLBACK_NAME: &str = "newrelic";

/// Errors raised by a monitoring sink
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("monitoring sink unavailable: {0}")]
    Unavailable(String),
    #[error("monitoring sink rejected record: {0}")]
    Rejected(String),
}

/// External monitoring backend
///
/// Both record operations are expected to be in-memory hand-offs that never
/// block on I/O.
pub trait MonitoringSink: Send + Sync {
    /// Whether the backend currently accepts records
    fn is_enabled(&self) -> bool;

    fn record_custom_event(&self, event_type: &str, attributes: &Attributes) -> Result<(), SinkError>;

    fn record_custom_metric(&self, name: &str, value: f64) -> Result<(), SinkError>;
}

/// Host hook notified whenever a monitoring callback fails
pub trait FailureHook: Send + Sync {
    fn handle_callback_failure(&self, callback_name: &str);
}

/// Default hook: counts failures on the local `metrics` recorder
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsFailureHook;

impl FailureHook for MetricsFailureHook {
    fn handle_callback_failure(&self, callback_name: &str) {
        crate::metrics::record_callback_failure(callback_name);
    }
}

/// Outcome of a successful sink call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Recorded,
    /// Sink disabled; nothing was sent
    Skipped,
}

/// Call-through to the monitoring sink with failure isolation
#[derive(Clone)]
pub struct SinkAdapter {
    sink: Arc<dyn MonitoringSink>,
    hook: Arc<dyn FailureHook>,
}

impl SinkAdapter {
    pub fn new(sink: Arc<dyn MonitoringSink>, hook: Arc<dyn FailureHook>) -> Self {
        Self { sink, hook }
    }

    pub fn emit_event(&self, event_type: &str, attributes: &Attributes) -> Result<Emission, SinkError> {
        if !self.sink.is_enabled() {
            tracing::debug!(event_type, "Monitoring sink is not enabled, skipping event");
            return Ok(Emission::Skipped);
        }

        self.sink.record_custom_event(event_type, attributes)?;
        crate::metrics::record_event(event_type);
        Ok(Emission::Recorded)
    }

    pub fn emit_metric(&self, name: &str, value: f64) -> Result<Emission, SinkError> {
        if !self.sink.is_enabled() {
            tracing::debug!(metric = name, "Monitoring sink is not enabled, skipping metric");
            return Ok(Emission::Skipped);
        }

        self.sink.record_custom_metric(name, value)?;
        crate::metrics::record_metric(name);
        Ok(Emission::Recorded)
    }

    /// Log a failure and notify the host hook
    pub fn report_failure(&self, context: &str, error: &dyn fmt::Display) {
        tracing::warn!(error = %error, "Failed to record {}", context);
        self.hook.handle_callback_failure(CALLBACK_NAME);
    }
}
