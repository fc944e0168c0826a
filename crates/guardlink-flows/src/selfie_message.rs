//! Selfie-request reminder message.

use guardlink_core::{FieldSpec, FlowError, FlowRecord, Schema};
use serde::{Deserialize, Serialize};

use crate::definition::FlowDefinition;

/// Flow name.
pub const NAME: &str = "generateSelfieRequestMessage";

/// Who to ask, where, and by when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInput {
    /// Guard's display name.
    pub guard_name: String,
    /// Site the guard is posted at.
    pub site_name: String,
    /// Time the selfie is due, as shown to the guard.
    pub time: String,
}

/// Message text ready to send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOutput {
    /// The reminder.
    pub message: String,
}

/// Input shape.
pub const INPUT_SCHEMA: Schema = Schema::new(
    "MessageInput",
    &[
        FieldSpec::string("guardName", "The name of the security guard."),
        FieldSpec::string("siteName", "The name of the site the guard is assigned to."),
        FieldSpec::string("time", "The time by which the selfie should be submitted."),
    ],
);

/// Output shape.
pub const OUTPUT_SCHEMA: Schema = Schema::new(
    "MessageOutput",
    &[FieldSpec::string(
        "message",
        "The selfie request message to send to the guard.",
    )],
);

impl FlowRecord for MessageInput {
    const SCHEMA: &'static Schema = &INPUT_SCHEMA;
}

impl FlowRecord for MessageOutput {
    const SCHEMA: &'static Schema = &OUTPUT_SCHEMA;
}

/// Prompt template.
pub const TEMPLATE: &str = "\
Write a short, polite message to security guard {{guardName}}, who is on duty at
{{siteName}}, asking them to submit a selfie check by {{time}}. Make it clear the
selfie confirms they are at their post. Two sentences at most, suitable for SMS.";

/// Build the flow definition.
pub fn definition() -> Result<FlowDefinition<MessageInput, MessageOutput>, FlowError> {
    FlowDefinition::new(NAME, TEMPLATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_guard_site_and_time() {
        let prompt = definition()
            .unwrap()
            .render(&MessageInput {
                guard_name: "Jane Smith".into(),
                site_name: "Tech Park One".into(),
                time: "14:00".into(),
            })
            .unwrap();
        assert!(prompt.contains("Jane Smith"));
        assert!(prompt.contains("Tech Park One"));
        assert!(prompt.contains("14:00"));
    }
}
