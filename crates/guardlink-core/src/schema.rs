//! Declarative record schemas.
//!
//! A [`Schema`] is a named, ordered list of required fields, each with a
//! primitive [`FieldType`] and a human-readable description. Schemas are
//! built as `const` values from static slices so every flow's shape is fixed
//! at compile time; [`Schema::check`] catches programmer errors such as
//! duplicate field names when a flow is defined.
//!
//! At runtime a schema is used for two things only:
//! - shape-checking untrusted JSON ([`Schema::validate`])
//! - describing the expected output to the model ([`Schema::response_schema`])

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::errors::{FlowError, Violation};

/// Primitive type tag of a schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// JSON string.
    String,
    /// JSON number (integer or float).
    Number,
    /// JSON boolean.
    Boolean,
}

impl FieldType {
    /// Whether `value` has this primitive type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }

    /// Lowercase name, as used in prompts and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Uppercase OpenAPI type name the Gemini `responseSchema` expects.
    fn api_type(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One required field of a [`Schema`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire name of the field (camelCase).
    pub name: &'static str,
    /// Primitive type.
    pub ty: FieldType,
    /// Human-readable description, forwarded to the model.
    pub description: &'static str,
}

impl FieldSpec {
    /// A string field.
    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::String,
            description,
        }
    }

    /// A number field.
    pub const fn number(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::Number,
            description,
        }
    }

    /// A boolean field.
    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::Boolean,
            description,
        }
    }
}

/// Named set of required, typed fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schema {
    name: &'static str,
    fields: &'static [FieldSpec],
}

impl Schema {
    /// Build a schema from a static field list.
    pub const fn new(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }

    /// Schema name (used in errors and logs).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Look up a field by wire name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Construction-time well-formedness check.
    ///
    /// Requires at least one field, no empty names and no duplicates.
    pub fn check(&self) -> Result<(), FlowError> {
        if self.fields.is_empty() {
            return Err(FlowError::Configuration(format!(
                "schema `{}` declares no fields",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for field in self.fields {
            if field.name.is_empty() {
                return Err(FlowError::Configuration(format!(
                    "schema `{}` has a field with an empty name",
                    self.name
                )));
            }
            if !seen.insert(field.name) {
                return Err(FlowError::Configuration(format!(
                    "schema `{}` declares field `{}` more than once",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }

    /// Shape-check `value` against this schema.
    ///
    /// Collects every violation rather than stopping at the first. On
    /// success returns the object restricted to the declared fields; fields
    /// the schema does not declare are dropped.
    pub fn validate(&self, value: &Value) -> Result<Map<String, Value>, FlowError> {
        let Some(object) = value.as_object() else {
            return Err(FlowError::violation(
                self.name,
                Violation::NotAnObject {
                    found: json_type_name(value),
                },
            ));
        };

        let mut violations = Vec::new();
        let mut projected = Map::new();
        for field in self.fields {
            match object.get(field.name) {
                None => violations.push(Violation::MissingField {
                    field: field.name.to_string(),
                }),
                Some(v) if !field.ty.matches(v) => violations.push(Violation::WrongType {
                    field: field.name.to_string(),
                    expected: field.ty,
                    found: json_type_name(v),
                }),
                Some(v) => {
                    let _ = projected.insert(field.name.to_string(), v.clone());
                }
            }
        }

        if violations.is_empty() {
            Ok(projected)
        } else {
            Err(FlowError::SchemaViolation {
                schema: self.name.to_string(),
                violations,
            })
        }
    }

    /// OpenAPI-subset object schema for the model's structured-output mode.
    pub fn response_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            let _ = properties.insert(
                field.name.to_string(),
                serde_json::json!({
                    "type": field.ty.api_type(),
                    "description": field.description,
                }),
            );
        }
        let names: Vec<&str> = self.fields.iter().map(|f| f.name).collect();
        serde_json::json!({
            "type": "OBJECT",
            "properties": properties,
            "required": names,
            "propertyOrdering": names,
        })
    }

    /// One line per field: `- name (type): description`.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("- {} ({}): {}", f.name, f.ty, f.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// JSON type name of a value, for violation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
