//! Flow error taxonomy.
//!
//! Every failure a flow invocation can produce maps onto one [`FlowError`]
//! variant. The core never retries; [`FlowError::is_retryable`] exists only
//! for callers that opt into a retry layer above the façade.

use std::fmt;
use std::time::Duration;

use crate::schema::FieldType;

/// A single way in which a JSON value failed to match a [`Schema`](crate::Schema).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// The top-level value was not a JSON object.
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// A required field was absent.
    MissingField {
        /// Field name.
        field: String,
    },
    /// A field was present with the wrong primitive type.
    WrongType {
        /// Field name.
        field: String,
        /// Declared type.
        expected: FieldType,
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// The response body was not parseable as JSON.
    InvalidJson {
        /// Parser message.
        reason: String,
    },
    /// The model produced no usable content.
    EmptyResponse {
        /// Why there was no content (finish or block reason), if known.
        reason: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => write!(f, "expected an object, found {found}"),
            Self::MissingField { field } => write!(f, "missing required field `{field}`"),
            Self::WrongType {
                field,
                expected,
                found,
            } => write!(f, "field `{field}` must be {expected}, found {found}"),
            Self::InvalidJson { reason } => write!(f, "response is not valid JSON: {reason}"),
            Self::EmptyResponse { reason } => write!(f, "empty response: {reason}"),
        }
    }
}

/// Errors produced while defining or invoking a flow.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FlowError {
    /// Malformed schema or template, or a placeholder/field mismatch.
    /// Fatal: retrying cannot help.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The model endpoint was unreachable or answered with a non-success status.
    #[error("transport error{}: {message}", status_suffix(.status))]
    Transport {
        /// HTTP status, when the endpoint answered at all.
        status: Option<u16>,
        /// Error description.
        message: String,
    },

    /// The model's response did not satisfy the declared output schema.
    #[error("response violates schema `{schema}`: {}", join_violations(.violations))]
    SchemaViolation {
        /// Name of the schema that was violated.
        schema: String,
        /// Every violation found.
        violations: Vec<Violation>,
    },

    /// The call exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the invocation.
    #[error("cancelled")]
    Cancelled,
}

impl FlowError {
    /// Shorthand for a [`FlowError::Transport`] with no HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Shorthand for a single-violation [`FlowError::SchemaViolation`].
    pub fn violation(schema: impl Into<String>, violation: Violation) -> Self {
        Self::SchemaViolation {
            schema: schema.into(),
            violations: vec![violation],
        }
    }

    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transport { .. } => "transport",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether an opt-in retry layer may try again.
    ///
    /// Connection failures, 408, 429, 5xx and timeouts qualify. Schema
    /// violations, configuration errors and cancellation never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } | Self::Timeout(_) => true,
            Self::Transport {
                status: Some(status),
                ..
            } => matches!(status, 408 | 429 | 500..=599),
            Self::Configuration(_) | Self::SchemaViolation { .. } | Self::Cancelled => false,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status() {
        let err = FlowError::Transport {
            status: Some(500),
            message: "internal".into(),
        };
        assert_eq!(err.to_string(), "transport error (500): internal");
        assert_eq!(
            FlowError::transport("connection refused").to_string(),
            "transport error: connection refused"
        );
    }

    #[test]
    fn schema_violation_display_lists_every_violation() {
        let err = FlowError::SchemaViolation {
            schema: "SummarizeCallOutput".into(),
            violations: vec![
                Violation::MissingField {
                    field: "summary".into(),
                },
                Violation::WrongType {
                    field: "extra".into(),
                    expected: FieldType::Boolean,
                    found: "string",
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("`SummarizeCallOutput`"));
        assert!(text.contains("missing required field `summary`"));
        assert!(text.contains("field `extra` must be boolean, found string"));
    }

    #[test]
    fn retryable_classification() {
        assert!(FlowError::transport("dns").is_retryable());
        assert!(FlowError::Timeout(Duration::from_secs(30)).is_retryable());
        for status in [408, 429, 500, 503] {
            let err = FlowError::Transport {
                status: Some(status),
                message: String::new(),
            };
            assert!(err.is_retryable(), "status {status} should be retryable");
        }
    }

    #[test]
    fn not_retryable_classification() {
        let bad_request = FlowError::Transport {
            status: Some(400),
            message: "bad".into(),
        };
        assert!(!bad_request.is_retryable());
        assert!(!FlowError::Configuration("dup".into()).is_retryable());
        assert!(!FlowError::Cancelled.is_retryable());
        assert!(
            !FlowError::violation("X", Violation::EmptyResponse { reason: "SAFETY".into() })
                .is_retryable()
        );
    }

    #[test]
    fn kind_strings() {
        assert_eq!(FlowError::Cancelled.kind(), "cancelled");
        assert_eq!(FlowError::Timeout(Duration::ZERO).kind(), "timeout");
        assert_eq!(FlowError::transport("x").kind(), "transport");
        assert_eq!(FlowError::Configuration("x".into()).kind(), "configuration");
        assert_eq!(
            FlowError::violation("X", Violation::NotAnObject { found: "array" }).kind(),
            "schema_violation"
        );
    }
}
