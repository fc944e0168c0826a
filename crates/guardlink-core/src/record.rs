//! Typed records bound to their schemas.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::FlowError;
use crate::schema::Schema;

/// A flow input or output record.
///
/// The struct gives compile-time typing to internal code; [`FlowRecord::SCHEMA`]
/// is what untrusted JSON is checked against before it becomes a `Self`.
pub trait FlowRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Declared shape of the record's wire form.
    const SCHEMA: &'static Schema;

    /// Serialise to a JSON object and confirm it matches [`Self::SCHEMA`].
    ///
    /// A mismatch means the struct and its schema disagree, which is a
    /// configuration error rather than bad input.
    fn to_fields(&self) -> Result<Map<String, Value>, FlowError> {
        let value = serde_json::to_value(self).map_err(|e| {
            FlowError::Configuration(format!("`{}` failed to serialise: {e}", Self::SCHEMA.name()))
        })?;
        Self::SCHEMA.validate(&value).map_err(|e| {
            FlowError::Configuration(format!(
                "`{}` does not match its own schema: {e}",
                Self::SCHEMA.name()
            ))
        })
    }

    /// Validate untrusted JSON against [`Self::SCHEMA`] and deserialise it.
    fn from_value(value: &Value) -> Result<Self, FlowError> {
        let projected = Self::SCHEMA.validate(value)?;
        serde_json::from_value(Value::Object(projected)).map_err(|e| {
            FlowError::violation(
                Self::SCHEMA.name(),
                crate::errors::Violation::InvalidJson {
                    reason: e.to_string(),
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Shift {
        guard_id: String,
        hours: u32,
    }

    const SHIFT: Schema = Schema::new(
        "Shift",
        &[
            FieldSpec::string("guardId", "Guard identifier."),
            FieldSpec::number("hours", "Hours on shift."),
        ],
    );

    impl FlowRecord for Shift {
        const SCHEMA: &'static Schema = &SHIFT;
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Mislabelled {
        guard: String,
    }

    impl FlowRecord for Mislabelled {
        const SCHEMA: &'static Schema = &SHIFT;
    }

    #[test]
    fn to_fields_uses_wire_names() {
        let shift = Shift {
            guard_id: "GL001".into(),
            hours: 8,
        };
        let fields = shift.to_fields().unwrap();
        assert_eq!(fields["guardId"], json!("GL001"));
        assert_eq!(fields["hours"], json!(8));
    }

    #[test]
    fn to_fields_flags_struct_schema_mismatch_as_configuration() {
        let bad = Mislabelled {
            guard: "GL001".into(),
        };
        assert_matches!(bad.to_fields(), Err(FlowError::Configuration(_)));
    }

    #[test]
    fn from_value_round_trips_exact_record() {
        let value = json!({ "guardId": "GL002", "hours": 12, "note": "ignored" });
        let shift = Shift::from_value(&value).unwrap();
        assert_eq!(
            shift,
            Shift {
                guard_id: "GL002".into(),
                hours: 12
            }
        );
    }

    #[test]
    fn from_value_rejects_number_outside_struct_range() {
        // Passes the shape check (it is a number) but cannot become a u32.
        let value = json!({ "guardId": "GL002", "hours": -3 });
        assert_matches!(
            Shift::from_value(&value),
            Err(FlowError::SchemaViolation { .. })
        );
    }
}
