//! Prompt template parsing and rendering.
//!
//! Templates use `{{ name }}` placeholders. The text is parsed once into
//! literal and placeholder segments, so rendering is a single pass: values
//! are inserted verbatim and never re-scanned. A transcript that happens to
//! contain `{{ summary }}` is rendered as that literal text.

use serde_json::{Map, Value};

use crate::errors::FlowError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// An immutable, pre-parsed prompt template.
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse template text.
    ///
    /// Fails with [`FlowError::Configuration`] on an unterminated `{{` or a
    /// placeholder name that is empty or contains characters other than
    /// ASCII letters, digits and `_`.
    pub fn parse(source: impl Into<String>) -> Result<Self, FlowError> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut rest = source.as_str();
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                return Err(FlowError::Configuration(format!(
                    "unterminated placeholder at byte {}",
                    offset + open
                )));
            };
            let name = after_open[..close].trim();
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(FlowError::Configuration(format!(
                    "invalid placeholder `{{{{{}}}}}` at byte {}",
                    &after_open[..close],
                    offset + open
                )));
            }
            segments.push(Segment::Placeholder(name.to_string()));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { source, segments })
    }

    /// Original template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute every placeholder from `values`.
    ///
    /// A placeholder with no entry in `values` is a configuration error;
    /// it is never left blank.
    pub fn render(&self, values: &Map<String, Value>) -> Result<String, FlowError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values.get(name).ok_or_else(|| {
                        FlowError::Configuration(format!(
                            "placeholder `{name}` has no matching input field"
                        ))
                    })?;
                    out.push_str(&value_to_text(value));
                }
            }
        }
        Ok(out)
    }
}

/// Textual form of a field value inside a prompt.
///
/// Strings are inserted as-is (no quotes), numbers and booleans use their
/// JSON spelling, `null` becomes empty text and compound values compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn parses_placeholders_in_order() {
        let source = "Guard {{guardId}} missed {{ missed }} of {{total}}; {{guardId}}.";
        let t = PromptTemplate::parse(source).unwrap();
        assert_eq!(t.placeholders(), vec!["guardId", "missed", "total"]);
    }

    #[test]
    fn renders_strings_numbers_and_booleans() {
        let t = PromptTemplate::parse("{{name}} / {{count}} / {{ok}} / {{ratio}}").unwrap();
        let out = t
            .render(&fields(json!({
                "name": "Jane Smith",
                "count": 8,
                "ok": false,
                "ratio": 0.25
            })))
            .unwrap();
        assert_eq!(out, "Jane Smith / 8 / false / 0.25");
    }

    #[test]
    fn template_without_placeholders_renders_verbatim() {
        let t = PromptTemplate::parse("plain text").unwrap();
        assert!(t.placeholders().is_empty());
        assert_eq!(t.render(&Map::new()).unwrap(), "plain text");
    }

    #[test]
    fn missing_value_is_configuration_error() {
        let t = PromptTemplate::parse("Site: {{siteName}}").unwrap();
        let err = t.render(&fields(json!({ "site": "Tech Park One" }))).unwrap_err();
        assert_matches!(err, FlowError::Configuration(msg) if msg.contains("siteName"));
    }

    #[test]
    fn unterminated_placeholder_rejected() {
        assert_matches!(
            PromptTemplate::parse("Call: {{callDetails"),
            Err(FlowError::Configuration(msg)) if msg.contains("byte 6")
        );
    }

    #[test]
    fn invalid_placeholder_names_rejected() {
        assert!(PromptTemplate::parse("{{}}").is_err());
        assert!(PromptTemplate::parse("{{ guard id }}").is_err());
        assert!(PromptTemplate::parse("{{guard.id}}").is_err());
    }

    #[test]
    fn inserted_text_is_not_re_expanded() {
        let t = PromptTemplate::parse("Transcript: {{callDetails}}").unwrap();
        let out = t
            .render(&fields(json!({ "callDetails": "caller said {{callDetails}} twice" })))
            .unwrap();
        assert_eq!(out, "Transcript: caller said {{callDetails}} twice");
    }

    #[test]
    fn null_and_compound_values() {
        assert_eq!(value_to_text(&Value::Null), "");
        assert_eq!(value_to_text(&json!(["a", 1])), r#"["a",1]"#);
        assert_eq!(value_to_text(&json!(true)), "true");
    }

    proptest! {
        #[test]
        fn every_field_text_appears_and_no_placeholder_survives(
            guard_name in "[A-Za-z ]{1,24}",
            site_name in "[A-Za-z0-9 ]{1,24}",
            missed in 0u32..1000,
        ) {
            let t = PromptTemplate::parse(
                "Remind {{guardName}} at {{ siteName }} ({{missed}} missed).",
            ).unwrap();
            let out = t.render(&fields(json!({
                "guardName": guard_name,
                "siteName": site_name,
                "missed": missed,
            }))).unwrap();
            prop_assert!(out.contains(&guard_name));
            prop_assert!(out.contains(&site_name));
            prop_assert!(out.contains(&missed.to_string()));
            prop_assert!(!out.contains("{{"));
        }
    }
}
