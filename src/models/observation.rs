use serde::{Deserialize, Serialize};

/// Distributed-tracing correlation recovered from request headers
///
/// Only ever attached as `Option<TraceContext>`: when no trace id can be
/// recovered, no correlation field is emitted at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// Trace identifier (32 hex chars for a W3C traceparent)
    pub trace_id: String,
    /// Span identifier; never recovered from the traceparent route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

impl TraceContext {
    pub fn from_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: None,
        }
    }
}

/// Token usage reported by the response, zero when missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Sampling parameters echoed into the summary event when present
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

/// One chat message (request side or response side) after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Message role ("user", "assistant", "system", "tool", ...)
    pub role: String,
    /// Position in request-then-response order, starting at 0
    pub sequence: usize,
    /// Model name echoed by the response
    pub response_model: String,
    /// Provider the request was routed to
    pub vendor: String,
    /// Message text, only present when content recording is allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `Some(true)` for messages taken from response choices, `None` otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_response: Option<bool>,
    /// Unix milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}
