//! Event builders
//!
//! Pure functions turning extracted fields into the summary event and the
//! ordered list of message events for one observation.

use crate::extract::{self, ExtractedFields};
use crate::models::events::INGEST_SOURCE;
use crate::models::{MessageEvent, NormalizedMessage, SummaryEvent, TraceContext};
use crate::redaction::ContentPolicy;
use serde_json::Value;

/// Normalize request messages followed by response choice messages
///
/// Sequence numbers are assigned from the running list length, so they are
/// always `0..n` regardless of how many entries each side contributes.
/// Timestamps come from the request payload's own `start_time`/`end_time`.
pub fn normalize_messages(
    kwargs: &Value,
    response: &Value,
    response_model: &str,
    vendor: &str,
    policy: &ContentPolicy,
) -> Vec<NormalizedMessage> {
    let start_ms = kwargs
        .get("start_time")
        .and_then(extract::timestamp_seconds)
        .map(extract::epoch_millis);
    let end_ms = kwargs
        .get("end_time")
        .and_then(extract::timestamp_seconds)
        .map(extract::epoch_millis);

    let mut messages = Vec::new();

    for msg in extract::request_messages(kwargs) {
        messages.push(NormalizedMessage {
            role: extract::role(msg, "user"),
            sequence: messages.len(),
            response_model: response_model.to_string(),
            vendor: vendor.to_string(),
            content: content_for(msg, policy),
            is_response: None,
            timestamp: start_ms,
        });
    }

    for msg in extract::response_messages(response) {
        messages.push(NormalizedMessage {
            role: extract::role(msg, "assistant"),
            sequence: messages.len(),
            response_model: response_model.to_string(),
            vendor: vendor.to_string(),
            content: content_for(msg, policy),
            is_response: Some(true),
            timestamp: end_ms,
        });
    }

    messages
}

// Checked for every message rather than once per request.
fn content_for(message: &Value, policy: &ContentPolicy) -> Option<String> {
    if policy.should_record_content() {
        Some(extract::message_content(message))
    } else {
        None
    }
}

/// Build the `LlmChatCompletionSummary` event
///
/// `summary_id` is the adapter-generated correlation id; it becomes both
/// `id` and `request_id`.
pub fn build_summary(summary_id: &str, fields: &ExtractedFields, number_of_messages: usize) -> SummaryEvent {
    let (trace_id, span_id) = trace_attributes(fields.trace.as_ref());

    SummaryEvent {
        id: summary_id.to_string(),
        request_id: summary_id.to_string(),
        request_model: fields.request_model.clone(),
        response_model: fields.response_model.clone(),
        finish_reason: fields.finish_reason.clone(),
        number_of_messages,
        vendor: fields.vendor.clone(),
        ingest_source: INGEST_SOURCE,
        prompt_tokens: fields.usage.prompt_tokens,
        completion_tokens: fields.usage.completion_tokens,
        total_tokens: fields.usage.total_tokens,
        trace_id,
        span_id,
        duration: fields.duration_ms,
        temperature: fields.params.temperature,
        max_tokens: fields.params.max_tokens,
    }
}

/// Build one `LlmChatCompletionMessage` event per normalized message
///
/// Event ids are `{completion_id}-{sequence}`; `summary_id` links every
/// message back to its summary event.
pub fn build_messages(
    messages: &[NormalizedMessage],
    summary_id: &str,
    completion_id: &str,
    trace: Option<&TraceContext>,
) -> Vec<MessageEvent> {
    let (trace_id, span_id) = trace_attributes(trace);

    messages
        .iter()
        .map(|message| MessageEvent {
            id: format!("{}-{}", completion_id, message.sequence),
            request_id: summary_id.to_string(),
            completion_id: summary_id.to_string(),
            role: message.role.clone(),
            sequence: message.sequence,
            response_model: message.response_model.clone(),
            vendor: message.vendor.clone(),
            ingest_source: INGEST_SOURCE,
            token_count: 0,
            trace_id: trace_id.clone(),
            span_id: span_id.clone(),
            content: message.content.clone(),
            is_response: message.is_response.filter(|is_response| *is_response),
            timestamp: message.timestamp,
        })
        .collect()
}

fn trace_attributes(trace: Option<&TraceContext>) -> (Option<String>, Option<String>) {
    match trace {
        Some(ctx) if !ctx.trace_id.is_empty() => (Some(ctx.trace_id.clone()), ctx.span_id.clone()),
        _ => (None, None),
    }
}
