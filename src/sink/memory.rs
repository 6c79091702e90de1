//! In-memory sink and failure hook
//!
//! Keeps every record in process memory. Used by the `replay` command and by
//! tests to observe exactly what the adapter emits.

use super::{FailureHook, MonitoringSink, SinkError};
use crate::models::Attributes;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEvent {
    pub event_type: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedMetric {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Default)]
struct Failures {
    /// Fail every call with this error
    always: Option<SinkError>,
    /// Accept this many more events, then fail
    events_remaining: Option<usize>,
}

/// Thread-safe recording sink
#[derive(Debug)]
pub struct MemorySink {
    enabled: AtomicBool,
    events: Mutex<Vec<RecordedEvent>>,
    metrics: Mutex<Vec<RecordedMetric>>,
    failures: Mutex<Failures>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            events: Mutex::new(Vec::new()),
            metrics: Mutex::new(Vec::new()),
            failures: Mutex::new(Failures::default()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Make every subsequent call fail with `error` (`None` clears it)
    pub fn fail_with(&self, error: Option<SinkError>) {
        lock(&self.failures).always = error;
    }

    /// Accept `count` more events, then reject the rest
    pub fn fail_events_after(&self, count: usize) {
        lock(&self.failures).events_remaining = Some(count);
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<RecordedEvent> {
        lock(&self.events)
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn metrics(&self) -> Vec<RecordedMetric> {
        lock(&self.metrics).clone()
    }

    /// Number of times `name` was recorded
    pub fn metric_count(&self, name: &str) -> usize {
        lock(&self.metrics).iter().filter(|m| m.name == name).count()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
        lock(&self.metrics).clear();
    }
}

impl MonitoringSink for MemorySink {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn record_custom_event(&self, event_type: &str, attributes: &Attributes) -> Result<(), SinkError> {
        {
            let mut failures = lock(&self.failures);
            if let Some(err) = &failures.always {
                return Err(err.clone());
            }
            if let Some(remaining) = failures.events_remaining.as_mut() {
                if *remaining == 0 {
                    return Err(SinkError::Rejected(format!("event {} rejected", event_type)));
                }
                *remaining -= 1;
            }
        }

        lock(&self.events).push(RecordedEvent {
            event_type: event_type.to_string(),
            attributes: attributes.clone(),
        });
        Ok(())
    }

    fn record_custom_metric(&self, name: &str, value: f64) -> Result<(), SinkError> {
        if let Some(err) = &lock(&self.failures).always {
            return Err(err.clone());
        }

        lock(&self.metrics).push(RecordedMetric {
            name: name.to_string(),
            value,
        });
        Ok(())
    }
}

/// Failure hook that remembers every callback name it was given
#[derive(Debug, Default)]
pub struct RecordingFailureHook {
    calls: Mutex<Vec<String>>,
}

impl RecordingFailureHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

impl FailureHook for RecordingFailureHook {
    fn handle_callback_failure(&self, callback_name: &str) {
        lock(&self.calls).push(callback_name.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
