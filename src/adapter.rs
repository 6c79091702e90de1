//! AI monitoring adapter
//!
//! Observes finished gateway requests and turns each one into:
//! - one `LlmChatCompletionSummary` event
//! - one `LlmChatCompletionMessage` event per request/response message
//! - an `LLM/LiteLLM/Error` counter increment for failed requests
//!
//! plus a rate-limited supportability metric. Nothing here ever fails the
//! host request: every public entry point swallows and reports errors.

use crate::config::MonitorConfig;
use crate::error::{error_type_name, MonitorError};
use crate::events;
use crate::extract::{self, ExtractOptions};
use crate::heartbeat::{HeartbeatLimiter, HeartbeatState};
use crate::models::events::{ERROR_METRIC_NAME, MESSAGE_EVENT_TYPE, SUMMARY_EVENT_TYPE};
use crate::models::Attributes;
use crate::redaction::ContentPolicy;
use crate::sink::{Emission, FailureHook, MonitoringSink, SinkAdapter};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct MonitoringAdapter {
    enabled: bool,
    policy: ContentPolicy,
    extract_options: ExtractOptions,
    supportability_metric: String,
    sink: SinkAdapter,
    heartbeat: HeartbeatLimiter,
}

impl MonitoringAdapter {
    /// Create an adapter with its own heartbeat state
    pub fn new(config: &MonitorConfig, sink: Arc<dyn MonitoringSink>, hook: Arc<dyn FailureHook>) -> Self {
        let heartbeat = HeartbeatLimiter::new(Arc::new(HeartbeatState::new()), config.adapter.heartbeat);
        Self::with_heartbeat(config, sink, hook, heartbeat)
    }

    /// Create an adapter sharing an existing heartbeat limiter
    pub fn with_heartbeat(
        config: &MonitorConfig,
        sink: Arc<dyn MonitoringSink>,
        hook: Arc<dyn FailureHook>,
        heartbeat: HeartbeatLimiter,
    ) -> Self {
        let policy = config.content_policy();
        let enabled = config.has_credentials();

        if enabled {
            tracing::info!(
                app_name = config.app_name.as_deref().unwrap_or_default(),
                record_content = policy.should_record_content(),
                "AI monitoring initialized"
            );
        } else {
            tracing::warn!(
                "AI monitoring requires NEW_RELIC_LICENSE_KEY and NEW_RELIC_APP_NAME, integration will be disabled"
            );
        }

        Self {
            enabled,
            policy,
            extract_options: ExtractOptions {
                vendor_fallback: config.adapter.vendor_fallback.clone(),
                completion_id_order: config.adapter.completion_id_order,
            },
            supportability_metric: config.supportability_metric_name(),
            sink: SinkAdapter::new(sink, hook),
            heartbeat,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn should_record_content(&self) -> bool {
        self.policy.should_record_content()
    }

    pub fn supportability_metric_name(&self) -> &str {
        &self.supportability_metric
    }

    /// Called before the upstream request; nothing is recorded
    pub fn log_pre_api_call(&self, _model: &str, _messages: &Value, _kwargs: &Value) {}

    /// Called after the upstream request; nothing is recorded
    pub fn log_post_api_call(
        &self,
        _kwargs: &Value,
        _response: &Value,
        _start_time: Option<DateTime<Utc>>,
        _end_time: Option<DateTime<Utc>>,
    ) {
    }

    /// Record summary and message events for a successful request
    pub fn log_success_event(
        &self,
        kwargs: &Value,
        response: &Value,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) {
        if let Err(e) = self.process_success(kwargs, response, start_time, end_time) {
            self.report_entry_point_error("log_success_event", &e);
        }
    }

    /// Async twin of [`log_success_event`](Self::log_success_event)
    ///
    /// Sink calls are in-memory hand-offs, so this runs inline.
    pub async fn async_log_success_event(
        &self,
        kwargs: &Value,
        response: &Value,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) {
        if let Err(e) = self.process_success(kwargs, response, start_time, end_time) {
            self.report_entry_point_error("async_log_success_event", &e);
        }
    }

    /// Record the error counter for a failed request; no AI events are sent
    pub fn log_failure_event(
        &self,
        _kwargs: &Value,
        _response: &Value,
        _start_time: Option<DateTime<Utc>>,
        _end_time: Option<DateTime<Utc>>,
    ) {
        if self.enabled {
            self.record_error_metric();
        }
    }

    /// Async twin of [`log_failure_event`](Self::log_failure_event)
    pub async fn async_log_failure_event(
        &self,
        kwargs: &Value,
        response: &Value,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) {
        self.log_failure_event(kwargs, response, start_time, end_time);
    }

    fn process_success(
        &self,
        kwargs: &Value,
        response: &Value,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<(), MonitorError> {
        if !self.enabled {
            return Ok(());
        }

        self.check_and_emit_periodic_metric();

        let summary_id = Uuid::new_v4().to_string();
        let fields = extract::extract_fields(
            kwargs,
            response,
            start_time.map(extract::datetime_seconds),
            end_time.map(extract::datetime_seconds),
            &self.extract_options,
        );

        tracing::debug!(
            request_id = %summary_id,
            completion_id = %fields.completion_id,
            trace_id = fields.trace.as_ref().map(|t| t.trace_id.as_str()).unwrap_or("(none)"),
            "Processing successful LLM call"
        );

        let messages = events::normalize_messages(
            kwargs,
            response,
            &fields.response_model,
            &fields.vendor,
            &self.policy,
        );

        let summary = events::build_summary(&summary_id, &fields, messages.len());
        let message_events = events::build_messages(
            &messages,
            &summary_id,
            &fields.completion_id,
            fields.trace.as_ref(),
        );

        let summary_attributes = summary.to_attributes()?;
        let message_attributes = message_events
            .iter()
            .map(|event| event.to_attributes())
            .collect::<Result<Vec<_>, _>>()?;

        self.record_summary_event(&summary_attributes);
        self.record_message_events(&message_attributes);

        Ok(())
    }

    fn record_summary_event(&self, attributes: &Attributes) {
        match self.sink.emit_event(SUMMARY_EVENT_TYPE, attributes) {
            Ok(Emission::Recorded) => {
                tracing::debug!(attributes = ?attributes, "Recorded LlmChatCompletionSummary event");
            }
            Ok(Emission::Skipped) => {
                tracing::info!("Monitoring sink is not enabled, skipping summary event");
            }
            Err(e) => self.sink.report_failure("summary event", &e),
        }
    }

    // The first failing message aborts the rest of the batch.
    fn record_message_events(&self, events: &[Attributes]) {
        let mut recorded = 0usize;

        for attributes in events {
            match self.sink.emit_event(MESSAGE_EVENT_TYPE, attributes) {
                Ok(Emission::Recorded) => recorded += 1,
                Ok(Emission::Skipped) => {}
                Err(e) => {
                    self.sink.report_failure("message events", &e);
                    return;
                }
            }
        }

        tracing::debug!(
            recorded,
            total = events.len(),
            "Recorded LlmChatCompletionMessage events"
        );
    }

    fn record_error_metric(&self) {
        match self.sink.emit_metric(ERROR_METRIC_NAME, 1.0) {
            Ok(Emission::Recorded) => tracing::info!(metric = ERROR_METRIC_NAME, "Recorded error metric"),
            Ok(Emission::Skipped) => {}
            Err(e) => self.sink.report_failure("error metric", &e),
        }
    }

    fn check_and_emit_periodic_metric(&self) {
        self.heartbeat.check_and_emit(|| self.emit_supportability_metric());
    }

    // Runs under the heartbeat lock; must not fail past this point.
    fn emit_supportability_metric(&self) -> bool {
        match self.sink.emit_metric(&self.supportability_metric, 1.0) {
            Ok(Emission::Recorded) => {
                tracing::info!(metric = %self.supportability_metric, "Emitted supportability metric");
                true
            }
            Ok(Emission::Skipped) => {
                tracing::info!("Monitoring sink is not enabled, skipping supportability metric");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to emit supportability metric");
                false
            }
        }
    }

    fn report_entry_point_error(&self, entry_point: &str, error: &MonitorError) {
        tracing::warn!(
            entry_point,
            error = %error,
            error_type = error_type_name(error),
            "Error in AI monitoring callback"
        );
        self.sink.report_failure(entry_point, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::{HeartbeatConfig, ManualClock};
    use crate::sink::{MemorySink, RecordingFailureHook, SinkError};
    use serde_json::json;
    use std::time::Duration;

    fn enabled_config() -> MonitorConfig {
        MonitorConfig {
            license_key: Some("license".to_string()),
            app_name: Some("gateway".to_string()),
            ..Default::default()
        }
    }

    fn adapter_with(config: &MonitorConfig) -> (MonitoringAdapter, Arc<MemorySink>, Arc<RecordingFailureHook>) {
        let sink = Arc::new(MemorySink::new());
        let hook = Arc::new(RecordingFailureHook::new());
        let adapter = MonitoringAdapter::new(config, sink.clone(), hook.clone());
        (adapter, sink, hook)
    }

    fn kwargs() -> Value {
        json!({
            "model": "gpt",
            "messages": [{"role": "user", "content": "hi"}]
        })
    }

    fn response() -> Value {
        json!({
            "id": "abc",
            "model": "gpt",
            "choices": [{"message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        })
    }

    #[test]
    fn test_disabled_without_credentials() {
        let (adapter, sink, hook) = adapter_with(&MonitorConfig::default());
        assert!(!adapter.is_enabled());

        adapter.log_success_event(&kwargs(), &response(), None, None);
        adapter.log_failure_event(&kwargs(), &json!(null), None, None);

        assert!(sink.events().is_empty());
        assert!(sink.metrics().is_empty());
        assert!(hook.calls().is_empty());
    }

    #[test]
    fn test_success_emits_summary_then_messages() {
        let (adapter, sink, _) = adapter_with(&enabled_config());
        adapter.log_success_event(&kwargs(), &response(), None, None);

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, SUMMARY_EVENT_TYPE);
        assert_eq!(events[1].event_type, MESSAGE_EVENT_TYPE);
        assert_eq!(events[2].event_type, MESSAGE_EVENT_TYPE);

        let summary_id = events[0].attributes["id"].clone();
        assert_eq!(events[1].attributes["completion_id"], summary_id);
        assert_eq!(events[2].attributes["request_id"], summary_id);
        assert_ne!(summary_id, json!("abc"));
    }

    #[test]
    fn test_success_emits_supportability_metric_once() {
        let (adapter, sink, _) = adapter_with(&enabled_config());
        adapter.log_success_event(&kwargs(), &response(), None, None);
        adapter.log_success_event(&kwargs(), &response(), None, None);

        assert_eq!(sink.metric_count(adapter.supportability_metric_name()), 1);
    }

    #[test]
    fn test_failure_emits_only_error_counter() {
        let (adapter, sink, _) = adapter_with(&enabled_config());
        adapter.log_failure_event(&kwargs(), &response(), None, None);

        assert!(sink.events().is_empty());
        let metrics = sink.metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "LLM/LiteLLM/Error");
        assert_eq!(metrics[0].value, 1.0);
    }

    #[test]
    fn test_sink_failure_reports_to_hook() {
        let (adapter, sink, hook) = adapter_with(&enabled_config());
        sink.fail_with(Some(SinkError::Unavailable("agent down".to_string())));

        adapter.log_success_event(&kwargs(), &response(), None, None);

        // Summary and message batch each report once; heartbeat failures are only logged
        assert_eq!(hook.calls(), vec!["newrelic".to_string(), "newrelic".to_string()]);
    }

    #[test]
    fn test_message_batch_stops_at_first_failure() {
        let (adapter, sink, hook) = adapter_with(&enabled_config());
        // Summary and the first message are accepted
        sink.fail_events_after(2);

        adapter.log_success_event(&kwargs(), &response(), None, None);

        assert_eq!(sink.events_of_type(MESSAGE_EVENT_TYPE).len(), 1);
        assert_eq!(hook.calls().len(), 1);
    }

    #[test]
    fn test_disabled_sink_skips_silently() {
        let (adapter, sink, hook) = adapter_with(&enabled_config());
        sink.set_enabled(false);

        adapter.log_success_event(&kwargs(), &response(), None, None);
        adapter.log_failure_event(&kwargs(), &response(), None, None);

        assert!(sink.events().is_empty());
        assert!(sink.metrics().is_empty());
        assert!(hook.calls().is_empty());
    }

    #[test]
    fn test_duration_from_callback_times() {
        let (adapter, sink, _) = adapter_with(&enabled_config());
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let end = start + chrono::Duration::milliseconds(1500);

        adapter.log_success_event(&kwargs(), &response(), Some(start), Some(end));

        let summary = &sink.events_of_type(SUMMARY_EVENT_TYPE)[0];
        assert_eq!(summary.attributes["duration"], 1500.0);
    }

    #[test]
    fn test_heartbeat_retries_after_disabled_sink() {
        let config = enabled_config();
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let heartbeat = HeartbeatLimiter::with_clock(
            Arc::new(HeartbeatState::new()),
            HeartbeatConfig::default(),
            clock.clone(),
        );
        let adapter = MonitoringAdapter::with_heartbeat(
            &config,
            sink.clone(),
            Arc::new(RecordingFailureHook::new()),
            heartbeat,
        );

        sink.set_enabled(false);
        adapter.log_success_event(&kwargs(), &response(), None, None);
        sink.set_enabled(true);
        clock.advance(Duration::from_secs(1));
        adapter.log_success_event(&kwargs(), &response(), None, None);

        assert_eq!(sink.metric_count(adapter.supportability_metric_name()), 1);
    }

    #[tokio::test]
    async fn test_async_entry_points() {
        let (adapter, sink, _) = adapter_with(&enabled_config());

        adapter.async_log_success_event(&kwargs(), &response(), None, None).await;
        adapter.async_log_failure_event(&kwargs(), &response(), None, None).await;

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.metric_count(ERROR_METRIC_NAME), 1);
    }
}
