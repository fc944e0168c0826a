//! Flow definitions and the per-invocation state machine.
//!
//! ```text
//! Idle -> Rendering -> Invoking -> Validating -> { Succeeded | Failed }
//! ```
//!
//! Rendering and validation are synchronous. Invoking is the only await
//! point, and it is raced against the caller's deadline and cancellation
//! token when [`InvokeOptions`] carries them.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use guardlink_core::{FlowError, FlowRecord, PromptTemplate};
use guardlink_llm::{ModelClient, ModelRequest, parse_record};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

/// Invocation stage, as recorded in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Holding only the caller's input.
    Idle,
    /// Checking the input and substituting it into the template.
    Rendering,
    /// Awaiting the model.
    Invoking,
    /// Checking the response against the output schema.
    Validating,
    /// Output record returned.
    Succeeded,
    /// Error returned; no partial output.
    Failed,
}

impl Stage {
    /// Lowercase name used as the `stage` log field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Rendering => "rendering",
            Self::Invoking => "invoking",
            Self::Validating => "validating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call deadline and cancellation.
///
/// The default carries neither: the call runs until the transport's own
/// timeout fires.
#[derive(Clone, Debug, Default)]
pub struct InvokeOptions {
    /// Upper bound on the model call.
    pub timeout: Option<Duration>,
    /// Abandons the model call when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl InvokeOptions {
    /// Options with no deadline and no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Run `call` under the deadline and token. Cancellation wins ties.
    async fn race<T>(
        &self,
        call: impl Future<Output = Result<T, FlowError>>,
    ) -> Result<T, FlowError> {
        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(FlowError::Timeout(limit)),
                },
                None => call.await,
            }
        };

        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(FlowError::Cancelled),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }
}

/// A named prompt flow from `I` to `O`.
///
/// Built once, immutable, invoked any number of times concurrently.
pub struct FlowDefinition<I, O> {
    name: &'static str,
    template: PromptTemplate,
    records: PhantomData<fn(&I) -> O>,
}

impl<I, O> fmt::Debug for FlowDefinition<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowDefinition")
            .field("name", &self.name)
            .field("template", &self.template.source())
            .finish_non_exhaustive()
    }
}

impl<I: FlowRecord, O: FlowRecord> FlowDefinition<I, O> {
    /// Check both schemas and the template.
    ///
    /// Placeholders and input fields must match one to one: a placeholder
    /// naming no input field, or an input field the template never uses, is
    /// a [`FlowError::Configuration`].
    pub fn new(name: &'static str, template: &str) -> Result<Self, FlowError> {
        I::SCHEMA.check()?;
        O::SCHEMA.check()?;
        let template = PromptTemplate::parse(template)?;

        let placeholders = template.placeholders();
        if let Some(unknown) = placeholders
            .iter()
            .find(|p| I::SCHEMA.field(p).is_none())
        {
            return Err(FlowError::Configuration(format!(
                "flow `{name}`: placeholder `{unknown}` is not a field of `{}`",
                I::SCHEMA.name()
            )));
        }
        if let Some(unused) = I::SCHEMA
            .fields()
            .iter()
            .find(|f| !placeholders.contains(&f.name))
        {
            return Err(FlowError::Configuration(format!(
                "flow `{name}`: input field `{}` is never referenced by the template",
                unused.name
            )));
        }

        debug!(
            flow = name,
            input = I::SCHEMA.name(),
            output = O::SCHEMA.name(),
            placeholders = placeholders.len(),
            output_fields = %O::SCHEMA.describe(),
            "flow defined"
        );

        Ok(Self {
            name,
            template,
            records: PhantomData,
        })
    }

    /// Flow name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Prompt template.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Check `input` against the input schema and render the prompt.
    pub fn render(&self, input: &I) -> Result<String, FlowError> {
        let fields = input.to_fields()?;
        self.template.render(&fields)
    }

    /// Run one invocation: render, call the model once, validate.
    pub async fn invoke(
        &self,
        client: &dyn ModelClient,
        input: &I,
        options: &InvokeOptions,
    ) -> Result<O, FlowError> {
        let span = info_span!("flow", flow = self.name, model = client.model());
        async {
            let started = Instant::now();
            let result = self.run(client, input, options).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &result {
                Ok(_) => info!(stage = %Stage::Succeeded, elapsed_ms, "flow succeeded"),
                Err(e) => warn!(
                    stage = %Stage::Failed,
                    error_kind = e.kind(),
                    error = %e,
                    elapsed_ms,
                    "flow failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        client: &dyn ModelClient,
        input: &I,
        options: &InvokeOptions,
    ) -> Result<O, FlowError> {
        debug!(stage = %Stage::Idle, "invocation started");
        if options.is_cancelled() {
            return Err(FlowError::Cancelled);
        }

        debug!(stage = %Stage::Rendering, "rendering prompt");
        let prompt = self.render(input)?;
        trace!(%prompt, "rendered prompt");

        debug!(stage = %Stage::Invoking, prompt_len = prompt.len(), "calling model");
        let request = ModelRequest {
            flow: self.name,
            prompt: &prompt,
            output_schema: O::SCHEMA,
        };
        let response = options.race(client.generate(&request)).await?;

        debug!(
            stage = %Stage::Validating,
            response_len = response.text.len(),
            "validating response"
        );
        trace!(text = %response.text, "model response");
        parse_record::<O>(&response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use guardlink_core::{FieldSpec, Schema};
    use guardlink_llm::{MockModelClient, MockResponse};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Shift {
        guard_name: String,
        hours: u32,
    }

    const SHIFT: Schema = Schema::new(
        "Shift",
        &[
            FieldSpec::string("guardName", "Guard name."),
            FieldSpec::number("hours", "Hours."),
        ],
    );

    impl FlowRecord for Shift {
        const SCHEMA: &'static Schema = &SHIFT;
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        note: String,
    }

    const NOTE: Schema = Schema::new("Note", &[FieldSpec::string("note", "Text.")]);

    impl FlowRecord for Note {
        const SCHEMA: &'static Schema = &NOTE;
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Dup {
        a: String,
    }

    const DUP: Schema = Schema::new(
        "Dup",
        &[FieldSpec::string("a", "x"), FieldSpec::string("a", "y")],
    );

    impl FlowRecord for Dup {
        const SCHEMA: &'static Schema = &DUP;
    }

    type ShiftFlow = FlowDefinition<Shift, Note>;

    fn shift() -> Shift {
        Shift {
            guard_name: "Jane Smith".into(),
            hours: 8,
        }
    }

    #[test]
    fn unknown_placeholder_fails_at_definition() {
        let err = ShiftFlow::new("shift", "{{guardName}} {{hours}} {{siteName}}").unwrap_err();
        assert_matches!(err, FlowError::Configuration(msg) if msg.contains("siteName"));
    }

    #[test]
    fn unreferenced_input_field_fails_at_definition() {
        let err = ShiftFlow::new("shift", "Only {{guardName}}").unwrap_err();
        assert_matches!(err, FlowError::Configuration(msg) if msg.contains("hours"));
    }

    #[test]
    fn duplicate_schema_field_fails_at_definition() {
        assert_matches!(
            FlowDefinition::<Dup, Note>::new("dup", "{{a}}"),
            Err(FlowError::Configuration(_))
        );
    }

    #[test]
    fn render_substitutes_every_field() {
        let flow = ShiftFlow::new("shift", "{{guardName}} works {{ hours }}h").unwrap();
        assert_eq!(flow.render(&shift()).unwrap(), "Jane Smith works 8h");
    }

    #[tokio::test]
    async fn invoke_returns_validated_record_and_sends_rendered_prompt() {
        let flow = ShiftFlow::new("shift", "{{guardName}} works {{hours}}h").unwrap();
        let mock = MockModelClient::new(vec![MockResponse::Json(json!({ "note": "ok" }))]);

        let out = flow
            .invoke(&mock, &shift(), &InvokeOptions::default())
            .await
            .unwrap();

        assert_eq!(out, Note { note: "ok".into() });
        assert_eq!(mock.prompts(), vec!["Jane Smith works 8h".to_string()]);
    }

    #[tokio::test]
    async fn invalid_response_yields_no_partial_record() {
        let flow = ShiftFlow::new("shift", "{{guardName}} {{hours}}").unwrap();
        let mock = MockModelClient::new(vec![MockResponse::Json(json!({ "other": "x" }))]);
        assert_matches!(
            flow.invoke(&mock, &shift(), &InvokeOptions::default()).await,
            Err(FlowError::SchemaViolation { .. })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapsing_is_timeout() {
        let flow = ShiftFlow::new("shift", "{{guardName}} {{hours}}").unwrap();
        let mock = MockModelClient::new(vec![MockResponse::delayed(
            Duration::from_secs(60),
            MockResponse::Json(json!({ "note": "late" })),
        )]);
        let options = InvokeOptions::new().with_timeout(Duration::from_secs(5));

        assert_eq!(
            flow.invoke(&mock, &shift(), &options).await,
            Err(FlowError::Timeout(Duration::from_secs(5)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_abandons_in_flight_call() {
        let flow = ShiftFlow::new("shift", "{{guardName}} {{hours}}").unwrap();
        let mock = MockModelClient::new(vec![MockResponse::delayed(
            Duration::from_secs(60),
            MockResponse::Json(json!({ "note": "late" })),
        )]);
        let token = CancellationToken::new();
        let options = InvokeOptions::new().with_cancel(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        assert_eq!(
            flow.invoke(&mock, &shift(), &options).await,
            Err(FlowError::Cancelled)
        );
        canceller.await.unwrap();
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_model_call() {
        let flow = ShiftFlow::new("shift", "{{guardName}} {{hours}}").unwrap();
        let mock = MockModelClient::new(vec![]);
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(
            flow.invoke(&mock, &shift(), &InvokeOptions::new().with_cancel(token))
                .await,
            Err(FlowError::Cancelled)
        );
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Validating.to_string(), "validating");
        assert_eq!(Stage::Failed.as_str(), "failed");
    }
}
