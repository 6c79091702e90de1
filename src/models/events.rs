//! AI monitoring event shapes
//!
//! Field names follow the monitoring backend's attribute names, so the
//! serde renames below are the wire contract.

use crate::error::MonitorError;
use serde::Serialize;

/// Flat attribute map handed to the sink
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Event type of the per-request aggregate record
pub const SUMMARY_EVENT_TYPE: &str = "LlmChatCompletionSummary";

/// Event type of the per-message record
pub const MESSAGE_EVENT_TYPE: &str = "LlmChatCompletionMessage";

/// Counter incremented once per failed request
pub const ERROR_METRIC_NAME: &str = "LLM/LiteLLM/Error";

/// Value of the `ingest_source` attribute on every event
pub const INGEST_SOURCE: &str = "litellm";

/// One `LlmChatCompletionSummary` event per observed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEvent {
    /// Freshly generated correlation id, not derived from the LLM response
    pub id: String,
    pub request_id: String,
    #[serde(rename = "request.model")]
    pub request_model: String,
    #[serde(rename = "response.model")]
    pub response_model: String,
    #[serde(rename = "response.choices.finish_reason")]
    pub finish_reason: String,
    #[serde(rename = "response.number_of_messages")]
    pub number_of_messages: usize,
    pub vendor: String,
    pub ingest_source: &'static str,
    #[serde(rename = "response.usage.prompt_tokens")]
    pub prompt_tokens: u64,
    #[serde(rename = "response.usage.completion_tokens")]
    pub completion_tokens: u64,
    #[serde(rename = "response.usage.total_tokens")]
    pub total_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    /// Milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(rename = "request.temperature", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "request.max_tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl SummaryEvent {
    pub fn to_attributes(&self) -> Result<Attributes, MonitorError> {
        to_attributes(self)
    }
}

/// One `LlmChatCompletionMessage` event per normalized message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEvent {
    /// `{completion_id}-{sequence}`
    pub id: String,
    /// Summary event id (foreign key)
    pub request_id: String,
    /// Summary event id (foreign key)
    pub completion_id: String,
    pub role: String,
    pub sequence: usize,
    #[serde(rename = "response.model")]
    pub response_model: String,
    pub vendor: String,
    pub ingest_source: &'static str,
    pub token_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_response: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl MessageEvent {
    pub fn to_attributes(&self) -> Result<Attributes, MonitorError> {
        to_attributes(self)
    }
}

fn to_attributes<T: Serialize>(event: &T) -> Result<Attributes, MonitorError> {
    match serde_json::to_value(event)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(MonitorError::Serialization(format!(
            "event serialized to non-object value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> SummaryEvent {
        SummaryEvent {
            id: "summary-1".to_string(),
            request_id: "summary-1".to_string(),
            request_model: "gpt-4".to_string(),
            response_model: "gpt-4-0613".to_string(),
            finish_reason: "stop".to_string(),
            number_of_messages: 2,
            vendor: "openai".to_string(),
            ingest_source: INGEST_SOURCE,
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            trace_id: None,
            span_id: None,
            duration: None,
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_summary_attribute_names() {
        let attrs = sample_summary().to_attributes().unwrap();

        assert_eq!(attrs["request.model"], "gpt-4");
        assert_eq!(attrs["response.model"], "gpt-4-0613");
        assert_eq!(attrs["response.choices.finish_reason"], "stop");
        assert_eq!(attrs["response.number_of_messages"], 2);
        assert_eq!(attrs["response.usage.total_tokens"], 15);
        assert_eq!(attrs["ingest_source"], "litellm");
    }

    #[test]
    fn test_summary_omits_absent_optionals() {
        let attrs = sample_summary().to_attributes().unwrap();

        for key in ["trace_id", "span_id", "duration", "request.temperature", "request.max_tokens"] {
            assert!(!attrs.contains_key(key), "{} should be omitted", key);
        }
    }

    #[test]
    fn test_summary_includes_present_optionals() {
        let mut summary = sample_summary();
        summary.trace_id = Some("abc".to_string());
        summary.duration = Some(1250.0);
        summary.temperature = Some(0.7);
        summary.max_tokens = Some(256);

        let attrs = summary.to_attributes().unwrap();
        assert_eq!(attrs["trace_id"], "abc");
        assert_eq!(attrs["duration"], 1250.0);
        assert_eq!(attrs["request.temperature"], 0.7);
        assert_eq!(attrs["request.max_tokens"], 256);
        assert!(!attrs.contains_key("span_id"));
    }

    #[test]
    fn test_message_event_attributes() {
        let event = MessageEvent {
            id: "chatcmpl-1-0".to_string(),
            request_id: "summary-1".to_string(),
            completion_id: "summary-1".to_string(),
            role: "user".to_string(),
            sequence: 0,
            response_model: "gpt-4".to_string(),
            vendor: "openai".to_string(),
            ingest_source: INGEST_SOURCE,
            token_count: 0,
            trace_id: None,
            span_id: None,
            content: None,
            is_response: None,
            timestamp: Some(1_700_000_000_000),
        };

        let attrs = event.to_attributes().unwrap();
        assert_eq!(attrs["id"], "chatcmpl-1-0");
        assert_eq!(attrs["completion_id"], "summary-1");
        assert_eq!(attrs["token_count"], 0);
        assert_eq!(attrs["timestamp"], 1_700_000_000_000i64);
        assert!(!attrs.contains_key("content"));
        assert!(!attrs.contains_key("is_response"));
    }
}
