//! Gemini API types and client configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public API base URL (API-key authentication).
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Gemini client configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// Model identifier, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// API base URL, without a trailing `/models`.
    pub base_url: String,
    /// Deadline for a whole request, surfaced as
    /// [`FlowError::Timeout`](guardlink_core::FlowError::Timeout).
    pub request_timeout: Duration,
    /// TCP/TLS connect deadline.
    pub connect_timeout: Duration,
    /// Sampling temperature; the API default applies when `None`.
    pub temperature: Option<f64>,
    /// Output token cap; the API default applies when `None`.
    pub max_output_tokens: Option<u32>,
}

impl GeminiConfig {
    /// Configuration for `model` against the public endpoint with default timeouts.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Self::default()
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request types
// ─────────────────────────────────────────────────────────────────────────────

/// `generateContent` request body.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; flows always send a single user turn.
    pub contents: Vec<Content>,
    /// Structured-output and sampling settings.
    pub generation_config: GenerationConfig,
}

/// One conversation turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn holding a single text part.
    pub fn user_text(text: &str) -> Self {
        Self {
            role: Some("user".into()),
            parts: vec![Part {
                text: Some(text.to_string()),
                thought: false,
            }],
        }
    }
}

/// A content part. Only text parts are produced or consumed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Part {
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on thinking-model reasoning parts, which are not part of the answer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

/// Generation settings.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Always `application/json`: structured-output mode.
    pub response_mime_type: &'static str,
    /// OpenAPI-subset schema the response must follow.
    pub response_schema: Value,
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Max output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response types
// ─────────────────────────────────────────────────────────────────────────────

/// `generateContent` response body.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Response candidates; empty when the prompt was blocked.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Token usage.
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    /// Present when the prompt itself was rejected.
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Concrete model version that served the request.
    #[serde(default)]
    pub model_version: Option<String>,
}

/// A response candidate.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Candidate content.
    #[serde(default)]
    pub content: Option<Content>,
    /// Finish reason (`STOP`, `MAX_TOKENS`, `SAFETY`, ...).
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl Candidate {
    /// Answer text: every non-thought text part, concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| &c.parts)
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

/// Prompt-level feedback.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Why the prompt was blocked, if it was.
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Token usage metadata.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt token count.
    #[serde(default)]
    pub prompt_token_count: u32,
    /// Candidates token count.
    #[serde(default)]
    pub candidates_token_count: u32,
    /// Total token count.
    #[serde(default)]
    pub total_token_count: u32,
}
