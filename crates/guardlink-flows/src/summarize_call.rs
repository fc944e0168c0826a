//! Emergency-call summarisation.

use guardlink_core::{FieldSpec, FlowError, FlowRecord, Schema};
use serde::{Deserialize, Serialize};

use crate::definition::FlowDefinition;

/// Flow name.
pub const NAME: &str = "summarizeCall";

/// Call transcript to summarise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeCallInput {
    /// Transcript and caller details.
    pub call_details: String,
}

/// Supervisor-facing summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeCallOutput {
    /// Concise summary of the call.
    pub summary: String,
}

/// Input shape.
pub const INPUT_SCHEMA: Schema = Schema::new(
    "SummarizeCallInput",
    &[FieldSpec::string(
        "callDetails",
        "Details of the emergency call, including the transcript and any caller information.",
    )],
);

/// Output shape.
pub const OUTPUT_SCHEMA: Schema = Schema::new(
    "SummarizeCallOutput",
    &[FieldSpec::string(
        "summary",
        "A concise summary of the emergency call for a security supervisor.",
    )],
);

impl FlowRecord for SummarizeCallInput {
    const SCHEMA: &'static Schema = &INPUT_SCHEMA;
}

impl FlowRecord for SummarizeCallOutput {
    const SCHEMA: &'static Schema = &OUTPUT_SCHEMA;
}

/// Prompt template.
pub const TEMPLATE: &str = "\
You are an assistant to a security supervisor monitoring guards across several sites.
Summarize the emergency call below so the supervisor can act on it immediately.
State what happened, where, when, who is affected, and any action already under way.
Keep the summary short and factual; do not speculate beyond the call details.

Call details:
{{ callDetails }}";

/// Build the flow definition.
pub fn definition() -> Result<FlowDefinition<SummarizeCallInput, SummarizeCallOutput>, FlowError> {
    FlowDefinition::new(NAME, TEMPLATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_well_formed() {
        let flow = definition().unwrap();
        assert_eq!(flow.name(), "summarizeCall");
        assert_eq!(flow.template().placeholders(), vec!["callDetails"]);
    }

    #[test]
    fn prompt_contains_transcript() {
        let flow = definition().unwrap();
        let prompt = flow
            .render(&SummarizeCallInput {
                call_details: "Fire alarm on 3rd floor, evacuating now, 2:14 AM".into(),
            })
            .unwrap();
        assert!(prompt.contains("Fire alarm on 3rd floor, evacuating now, 2:14 AM"));
        assert!(!prompt.contains("{{"));
    }
}
