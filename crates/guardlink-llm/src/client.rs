//! # Model client trait
//!
//! Every model backend implements [`ModelClient`]. A call is a single round
//! trip: the client sends the rendered prompt together with the output
//! schema and returns the raw response text. Parsing and validation happen
//! afterwards in [`parse_record`](crate::parse_record), so a client never
//! guesses a response into shape.

use async_trait::async_trait;
use guardlink_core::{FlowError, Schema};

/// A single prompt/response request.
#[derive(Clone, Copy, Debug)]
pub struct ModelRequest<'a> {
    /// Name of the flow issuing the request (logging only).
    pub flow: &'a str,
    /// Fully rendered prompt text.
    pub prompt: &'a str,
    /// Shape the response must satisfy.
    pub output_schema: &'a Schema,
}

/// Token accounting reported by the endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the generated candidate.
    pub output_tokens: u32,
    /// Total billed tokens.
    pub total_tokens: u32,
}

/// Raw, unvalidated model output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelResponse {
    /// Concatenated response text.
    pub text: String,
    /// Model that produced it.
    pub model: String,
    /// Token usage, when reported.
    pub usage: Option<TokenUsage>,
}

/// A generative-model backend.
///
/// Implementors must be `Send + Sync` so one client can serve concurrent
/// invocations. `generate` must not retry, cache, or coalesce requests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Backend identifier (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Send one request and return the raw response text.
    async fn generate(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, FlowError>;
}
