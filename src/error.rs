use crate::sink::SinkError;
use std::fmt;

/// Monitoring adapter error types
#[derive(Debug)]
pub enum MonitorError {
    /// Monitoring sink rejected or could not accept a record
    Sink(SinkError),
    /// Event attributes could not be serialized
    Serialization(String),
    /// Internal error
    InternalError(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sink(err) => write!(f, "Sink error: {}", err),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sink(err) => Some(err),
            _ => None,
        }
    }
}

/// Short machine-readable name, used as a log field
pub fn error_type_name(error: &MonitorError) -> &'static str {
    match error {
        MonitorError::Sink(_) => "sink_error",
        MonitorError::Serialization(_) => "serialization_error",
        MonitorError::InternalError(_) => "internal_error",
    }
}

// Implement conversions from common error types
impl From<SinkError> for MonitorError {
    fn from(err: SinkError) -> Self {
        Self::Sink(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}
