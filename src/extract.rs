//! Field extraction from loosely-typed gateway payloads
//!
//! Every function here is total: malformed or missing fields fall back to a
//! documented default and nothing returns an error. The request payload
//! (`kwargs`) and the response payload are kept as `serde_json::Value` and
//! projected into the typed models in one place.

use crate::models::{RequestParams, TraceContext, Usage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default for missing model names and finish reasons
pub const UNKNOWN: &str = "unknown";

/// Default vendor when the request carries no provider
pub const DEFAULT_VENDOR: &str = "litellm";

/// Which identifier wins when both the response id and the gateway call id exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionIdOrder {
    /// Response `id`, then `litellm_call_id`
    #[default]
    ResponseFirst,
    /// `litellm_call_id`, then response `id`
    CallIdFirst,
}

/// Per-adapter knobs for the extractors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub vendor_fallback: String,
    pub completion_id_order: CompletionIdOrder,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            vendor_fallback: DEFAULT_VENDOR.to_string(),
            completion_id_order: CompletionIdOrder::default(),
        }
    }
}

/// Everything the event builders need, pulled out of one observation
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    /// LLM completion id (e.g. "chatcmpl-..."), used for message event ids
    pub completion_id: String,
    pub vendor: String,
    pub request_model: String,
    pub response_model: String,
    pub usage: Usage,
    pub finish_reason: String,
    pub duration_ms: Option<f64>,
    pub params: RequestParams,
    pub trace: Option<TraceContext>,
}

/// Run every extractor over one observation
///
/// `start_time`/`end_time` are the callback's explicit times in Unix seconds.
pub fn extract_fields(
    kwargs: &Value,
    response: &Value,
    start_time: Option<f64>,
    end_time: Option<f64>,
    options: &ExtractOptions,
) -> ExtractedFields {
    let (request_model, response_model) = model_names(kwargs, response);

    ExtractedFields {
        completion_id: completion_id(kwargs, response, options.completion_id_order),
        vendor: vendor(kwargs, &options.vendor_fallback),
        request_model,
        response_model,
        usage: usage(response),
        finish_reason: finish_reason(response),
        duration_ms: duration_ms(kwargs, start_time, end_time),
        params: request_params(kwargs),
        trace: trace_context(kwargs),
    }
}

/// Completion id: response id, gateway call id, or a generated UUID
pub fn completion_id(kwargs: &Value, response: &Value, order: CompletionIdOrder) -> String {
    let from_response = || response.get("id").and_then(identifier);
    let from_call = || kwargs.get("litellm_call_id").and_then(identifier);

    let found = match order {
        CompletionIdOrder::ResponseFirst => from_response().or_else(from_call),
        CompletionIdOrder::CallIdFirst => from_call().or_else(from_response),
    };

    found.unwrap_or_else(|| {
        let generated = Uuid::new_v4().to_string();
        tracing::warn!(
            completion_id = %generated,
            "No completion ID found in request or response, generated one"
        );
        generated
    })
}

/// Provider the gateway routed the request to
pub fn vendor(kwargs: &Value, fallback: &str) -> String {
    kwargs
        .get("litellm_params")
        .and_then(|params| params.get("custom_llm_provider"))
        .and_then(Value::as_str)
        .filter(|provider| !provider.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Returns `(request_model, response_model)`
pub fn model_names(kwargs: &Value, response: &Value) -> (String, String) {
    let request_model = kwargs
        .get("model")
        .and_then(scalar_to_string)
        .unwrap_or_else(|| UNKNOWN.to_string());

    let response_model = response
        .get("model")
        .and_then(scalar_to_string)
        .unwrap_or_else(|| request_model.clone());

    (request_model, response_model)
}

pub fn usage(response: &Value) -> Usage {
    let Some(usage) = response.get("usage").filter(|u| u.is_object()) else {
        return Usage::default();
    };

    let count = |field: &str| usage.get(field).and_then(as_count).unwrap_or(0);

    Usage {
        prompt_tokens: count("prompt_tokens"),
        completion_tokens: count("completion_tokens"),
        total_tokens: count("total_tokens"),
    }
}

/// Finish reason of the first choice
pub fn finish_reason(response: &Value) -> String {
    response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("finish_reason"))
        .and_then(scalar_to_string)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Request duration in milliseconds
///
/// Prefers the gateway's precomputed `llm_api_duration_ms`, then the
/// callback's explicit start/end times (seconds).
pub fn duration_ms(kwargs: &Value, start_time: Option<f64>, end_time: Option<f64>) -> Option<f64> {
    if let Some(duration) = kwargs.get("llm_api_duration_ms").and_then(as_float) {
        return Some(duration);
    }

    match (start_time, end_time) {
        (Some(start), Some(end)) => Some((end - start) * 1000.0),
        _ => None,
    }
}

pub fn request_params(kwargs: &Value) -> RequestParams {
    let optional = kwargs.get("optional_params");

    RequestParams {
        temperature: optional
            .and_then(|p| p.get("temperature"))
            .and_then(as_float),
        max_tokens: optional
            .and_then(|p| p.get("max_tokens"))
            .and_then(as_count),
    }
}

/// Text recorded as a message's `content` attribute
///
/// Tool calls take precedence and are serialized to JSON, as is list
/// (multimodal) content. Missing content becomes an empty string.
/// Objects and non-string scalars are rendered as JSON text too
/// (`{"a":1}`, `false`, `42`).
pub fn message_content(message: &Value) -> String {
    if let Some(tool_calls) = message.get("tool_calls").filter(|calls| is_truthy(calls)) {
        return to_json_text(tool_calls);
    }

    match message.get("content") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => to_json_text(other),
    }
}

/// Trace id from the W3C `traceparent` header forwarded in request metadata
///
/// The span id is not recovered from this header; the proprietary
/// `newrelic` header is detected but not decoded.
pub fn trace_context(kwargs: &Value) -> Option<TraceContext> {
    let headers = kwargs
        .get("litellm_params")
        .and_then(|p| p.get("metadata"))
        .and_then(|m| m.get("headers"));

    let trace_id = headers
        .and_then(|h| header(h, "traceparent"))
        .and_then(parse_traceparent);

    match trace_id {
        Some(trace_id) => Some(TraceContext::from_trace_id(trace_id)),
        None => {
            if headers.and_then(|h| header(h, "newrelic")).is_some() {
                tracing::debug!("newrelic distributed tracing header present but not decoded");
            }
            tracing::debug!(
                "Trace id not available from distributed tracing headers, \
                 events will be recorded without trace correlation"
            );
            None
        }
    }
}

/// Trace id of a `version-traceid-spanid-flags` header value
pub fn parse_traceparent(value: &str) -> Option<String> {
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() != 4 || parts[1].is_empty() {
        return None;
    }
    Some(parts[1].to_string())
}

/// Request messages in their original order
pub fn request_messages(kwargs: &Value) -> &[Value] {
    kwargs
        .get("messages")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Messages of every response choice that carries one, in choice order
pub fn response_messages(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .get("choices")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter_map(|choice| choice.get("message"))
        .filter(|message| is_truthy(message))
}

/// Message role, or `default` when absent
pub fn role(message: &Value, default: &str) -> String {
    message
        .get("role")
        .and_then(scalar_to_string)
        .unwrap_or_else(|| default.to_string())
}

/// Unix seconds from either a number or an RFC 3339 string
pub fn timestamp_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok().or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| datetime_seconds(dt.with_timezone(&Utc)))
        }),
        _ => None,
    }
}

pub fn datetime_seconds(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

/// Unix seconds to Unix milliseconds, truncated
pub fn epoch_millis(seconds: f64) -> i64 {
    (seconds * 1000.0) as i64
}

fn header<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    headers
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// "NaN" and "inf" parse as floats but have no JSON form.
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn to_json_text(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
