//! Structured-output parsing.
//!
//! Response text is untrusted: it is parsed as JSON, checked against the
//! record's schema, and only then deserialised. Anything that does not fit
//! is reported as a [`FlowError::SchemaViolation`] and the raw text is dropped.

use guardlink_core::{FlowError, FlowRecord, Violation};
use serde_json::Value;

/// Parse model response text into `O`.
pub fn parse_record<O: FlowRecord>(text: &str) -> Result<O, FlowError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(FlowError::violation(
            O::SCHEMA.name(),
            Violation::EmptyResponse {
                reason: "no text".into(),
            },
        ));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        FlowError::violation(
            O::SCHEMA.name(),
            Violation::InvalidJson {
                reason: e.to_string(),
            },
        )
    })?;

    O::from_value(&value)
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````).
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };
    match inner.split_once('\n') {
        // First line is the (possibly empty) language tag.
        Some((tag, body)) if !tag.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}
