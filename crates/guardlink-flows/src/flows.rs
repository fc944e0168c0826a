//! The façade: one async entry point per flow.

use std::sync::Arc;

use guardlink_core::FlowError;
use guardlink_llm::ModelClient;
use tracing::{debug, info, warn};

use crate::definition::{FlowDefinition, InvokeOptions};
use crate::selfie_compliance::{self, ComplianceInput, ComplianceOutput};
use crate::selfie_message::{self, MessageInput, MessageOutput};
use crate::summarize_call::{self, SummarizeCallInput, SummarizeCallOutput};

/// The three flows bound to one model client.
///
/// Cheap to share behind an `Arc`; invocations hold no shared mutable state.
pub struct Flows {
    client: Arc<dyn ModelClient>,
    summarize_call: FlowDefinition<SummarizeCallInput, SummarizeCallOutput>,
    compliance: FlowDefinition<ComplianceInput, ComplianceOutput>,
    selfie_message: FlowDefinition<MessageInput, MessageOutput>,
}

impl Flows {
    /// Define every flow against `client`.
    ///
    /// Definition problems surface here, before any invocation.
    pub fn new(client: Arc<dyn ModelClient>) -> Result<Self, FlowError> {
        let flows = Self {
            summarize_call: summarize_call::definition()?,
            compliance: selfie_compliance::definition()?,
            selfie_message: selfie_message::definition()?,
            client,
        };
        info!(
            client = flows.client.name(),
            model = flows.client.model(),
            "flows ready"
        );
        Ok(flows)
    }

    /// Summarise an emergency call.
    pub async fn summarize_call(
        &self,
        input: SummarizeCallInput,
    ) -> Result<SummarizeCallOutput, FlowError> {
        self.summarize_call_with(input, &InvokeOptions::default())
            .await
    }

    /// [`Flows::summarize_call`] with a deadline and/or cancellation token.
    pub async fn summarize_call_with(
        &self,
        input: SummarizeCallInput,
        options: &InvokeOptions,
    ) -> Result<SummarizeCallOutput, FlowError> {
        self.summarize_call
            .invoke(self.client.as_ref(), &input, options)
            .await
    }

    /// Assess a guard's selfie compliance.
    pub async fn analyze_compliance(
        &self,
        input: ComplianceInput,
    ) -> Result<ComplianceOutput, FlowError> {
        self.analyze_compliance_with(input, &InvokeOptions::default())
            .await
    }

    /// [`Flows::analyze_compliance`] with a deadline and/or cancellation token.
    pub async fn analyze_compliance_with(
        &self,
        input: ComplianceInput,
        options: &InvokeOptions,
    ) -> Result<ComplianceOutput, FlowError> {
        let missed_ratio = input.missed_ratio();
        let exceeds_threshold = input.exceeds_threshold();
        debug!(
            guard_id = %input.guard_id,
            missed_ratio,
            exceeds_threshold,
            "analyzing selfie compliance"
        );

        let output = self
            .compliance
            .invoke(self.client.as_ref(), &input, options)
            .await?;

        // The model's verdict is returned as-is; a disagreement is only logged.
        if output.compliance_issue_identified != exceeds_threshold {
            warn!(
                guard_id = %input.guard_id,
                missed_ratio,
                verdict = output.compliance_issue_identified,
                "model verdict disagrees with missed-ratio threshold"
            );
        }
        Ok(output)
    }

    /// Draft a selfie-request message.
    pub async fn generate_selfie_message(
        &self,
        input: MessageInput,
    ) -> Result<MessageOutput, FlowError> {
        self.generate_selfie_message_with(input, &InvokeOptions::default())
            .await
    }

    /// [`Flows::generate_selfie_message`] with a deadline and/or cancellation token.
    pub async fn generate_selfie_message_with(
        &self,
        input: MessageInput,
        options: &InvokeOptions,
    ) -> Result<MessageOutput, FlowError> {
        self.selfie_message
            .invoke(self.client.as_ref(), &input, options)
            .await
    }
}
