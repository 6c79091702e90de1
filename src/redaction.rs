//! Content redaction policy
//!
//! Decides once, at adapter construction, whether message text may appear
//! in any outgoing event.

/// Resolved decision on recording message content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentPolicy {
    record_content: bool,
}

impl ContentPolicy {
    /// Resolve the policy from configuration
    ///
    /// An explicit `turn_off_message_logging` always wins (inverted). Otherwise
    /// the environment default is parsed: only a case-insensitive `"true"`
    /// enables recording.
    pub fn resolve(turn_off_message_logging: Option<bool>, env_value: Option<&str>) -> Self {
        let record_content = match turn_off_message_logging {
            Some(turn_off) => !turn_off,
            None => parse_bool_env(env_value, false),
        };

        Self { record_content }
    }

    pub fn allow_content() -> Self {
        Self { record_content: true }
    }

    pub fn redact_content() -> Self {
        Self { record_content: false }
    }

    pub fn should_record_content(&self) -> bool {
        self.record_content
    }
}

/// Parse a boolean environment value, accepting only `"true"` (any case)
fn parse_bool_env(value: Option<&str>, default: bool) -> bool {
    match value {
        None | Some("") => default,
        Some(v) => v.eq_ignore_ascii_case("true"),
    }
}
