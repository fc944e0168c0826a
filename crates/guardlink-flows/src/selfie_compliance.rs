//! Selfie-check compliance analysis.
//!
//! Guards are asked for periodic selfies to prove presence on site. A guard
//! has a compliance issue when they missed more than
//! [`MISSED_RATIO_THRESHOLD`] of the requests in the period. The threshold
//! is stated in the prompt; the model makes the call and the verdict it
//! returns is passed through unchanged.

use guardlink_core::{FieldSpec, FlowError, FlowRecord, Schema};
use serde::{Deserialize, Serialize};

use crate::definition::FlowDefinition;

/// Flow name.
pub const NAME: &str = "analyzeSelfieCompliance";

/// Missed/total ratio above which a guard is non-compliant.
pub const MISSED_RATIO_THRESHOLD: f64 = 0.20;

/// Selfie statistics for one guard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceInput {
    /// Guard identifier, e.g. `GL003`.
    pub guard_id: String,
    /// Selfie requests the guard did not answer.
    pub missed_selfie_count: u32,
    /// Selfie requests sent in the period.
    pub total_selfie_requests: u32,
}

impl ComplianceInput {
    /// Fraction of requests missed; `0.0` when none were sent.
    pub fn missed_ratio(&self) -> f64 {
        if self.total_selfie_requests == 0 {
            0.0
        } else {
            f64::from(self.missed_selfie_count) / f64::from(self.total_selfie_requests)
        }
    }

    /// Whether the missed ratio is over the policy threshold.
    pub fn exceeds_threshold(&self) -> bool {
        self.missed_ratio() > MISSED_RATIO_THRESHOLD
    }
}

/// Compliance verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceOutput {
    /// Whether a compliance issue exists.
    pub compliance_issue_identified: bool,
    /// Reasoning behind the verdict.
    pub analysis: String,
    /// Suggested follow-up for the supervisor.
    pub recommendations: String,
}

/// Input shape.
pub const INPUT_SCHEMA: Schema = Schema::new(
    "ComplianceInput",
    &[
        FieldSpec::string("guardId", "The ID of the security guard."),
        FieldSpec::number(
            "missedSelfieCount",
            "The number of selfie requests the guard missed.",
        ),
        FieldSpec::number(
            "totalSelfieRequests",
            "The total number of selfie requests sent to the guard.",
        ),
    ],
);

/// Output shape.
pub const OUTPUT_SCHEMA: Schema = Schema::new(
    "ComplianceOutput",
    &[
        FieldSpec::boolean(
            "complianceIssueIdentified",
            "True if the guard missed more than 20% of selfie requests.",
        ),
        FieldSpec::string("analysis", "Analysis of the guard's selfie compliance."),
        FieldSpec::string(
            "recommendations",
            "Recommended actions for the supervisor regarding this guard.",
        ),
    ],
);

impl FlowRecord for ComplianceInput {
    const SCHEMA: &'static Schema = &INPUT_SCHEMA;
}

impl FlowRecord for ComplianceOutput {
    const SCHEMA: &'static Schema = &OUTPUT_SCHEMA;
}

/// Prompt template.
pub const TEMPLATE: &str = "\
You are a compliance analyst for a security agency. Guards must answer periodic
selfie requests to prove they are present at their post.

Guard ID: {{ guardId }}
Missed selfie requests: {{ missedSelfieCount }}
Total selfie requests: {{ totalSelfieRequests }}

Policy: a compliance issue exists when the guard missed more than 20% of the
selfie requests (missed divided by total). A guard who received no requests
has no compliance issue.

Set complianceIssueIdentified according to the policy, explain the missed
percentage and your reasoning in analysis, and give the supervisor concrete
next steps in recommendations.";

/// Build the flow definition.
pub fn definition() -> Result<FlowDefinition<ComplianceInput, ComplianceOutput>, FlowError> {
    FlowDefinition::new(NAME, TEMPLATE)
}
