//! Gemini `generateContent` client.
//!
//! One non-streaming POST per call with structured-output mode enabled: the
//! flow's output schema travels as `generationConfig.responseSchema` and the
//! endpoint is asked for `application/json`. The client neither retries nor
//! caches; every failure is mapped onto a [`FlowError`] and returned.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use guardlink_core::{FlowError, Violation};
use tracing::{debug, error, info, instrument, trace};

use super::types::{
    Content, GeminiConfig, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};
use crate::client::{ModelClient, ModelRequest, ModelResponse, TokenUsage};

/// Gemini model client.
///
/// `Debug` shows the configuration only, with the API key redacted.
pub struct GeminiClient {
    config: GeminiConfig,
    /// HTTP client (reused across requests).
    client: reqwest::Client,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client with its own connection pool.
    ///
    /// Fails with [`FlowError::Configuration`] when the API key is empty or
    /// the HTTP client cannot be constructed.
    pub fn new(config: GeminiConfig) -> Result<Self, FlowError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| FlowError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(config, client)
    }

    /// Build a client on a shared HTTP client.
    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Result<Self, FlowError> {
        if config.api_key.trim().is_empty() {
            return Err(FlowError::Configuration(
                "Gemini API key is not set (GEMINI_API_KEY or model.apiKey)".into(),
            ));
        }
        if config.model.trim().is_empty() {
            return Err(FlowError::Configuration("Gemini model id is empty".into()));
        }

        info!(
            model = %config.model,
            base_url = %config.base_url,
            request_timeout_ms =
                u64::try_from(config.request_timeout.as_millis()).unwrap_or(u64::MAX),
            "Gemini client initialized"
        );

        Ok(Self { config, client })
    }

    fn api_url(&self, action: &str) -> String {
        format!(
            "{}/models/{}:{action}?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }

    fn build_request_body(&self, request: &ModelRequest<'_>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user_text(request.prompt)],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: request.output_schema.response_schema(),
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }

    /// The request URL carries the API key, so it is stripped from messages.
    fn map_reqwest_error(&self, err: reqwest::Error) -> FlowError {
        if err.is_timeout() {
            FlowError::Timeout(self.config.request_timeout)
        } else {
            FlowError::Transport {
                status: err.status().map(|s| s.as_u16()),
                message: err.without_url().to_string(),
            }
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(flow = request.flow, model = %self.config.model))]
    async fn generate(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, FlowError> {
        let body = self.build_request_body(request);
        let url = self.api_url("generateContent");
        let started = Instant::now();

        trace!(prompt = request.prompt, "Gemini request");

        let response = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !status.is_success() {
            let (message, code) = parse_api_error(&body_text, status.as_u16());
            error!(
                status = status.as_u16(),
                code = code.as_deref().unwrap_or("unknown"),
                elapsed_ms,
                "Gemini API error"
            );
            return Err(FlowError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        trace!(body = %body_text, "Gemini response");

        let schema = request.output_schema.name();
        let parsed: GenerateContentResponse = serde_json::from_str(&body_text).map_err(|e| {
            error!(status = status.as_u16(), elapsed_ms, "malformed generateContent response");
            FlowError::violation(
                schema,
                Violation::InvalidJson {
                    reason: format!("malformed generateContent response: {e}"),
                },
            )
        })?;

        let Some(candidate) = parsed.candidates.first() else {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".into());
            return Err(FlowError::violation(
                schema,
                Violation::EmptyResponse { reason },
            ));
        };

        let text = candidate.text();
        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .clone()
                .unwrap_or_else(|| "no text".into());
            return Err(FlowError::violation(
                schema,
                Violation::EmptyResponse { reason },
            ));
        }

        let usage = parsed.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        debug!(
            elapsed_ms,
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
            total_tokens = usage.map_or(0, |u| u.total_tokens),
            "Gemini call complete"
        );

        Ok(ModelResponse {
            text,
            model: parsed
                .model_version
                .unwrap_or_else(|| self.config.model.clone()),
            usage,
        })
    }
}

/// Extract `(message, status code)` from an API error body.
fn parse_api_error(body: &str, status: u16) -> (String, Option<String>) {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();
        let code = error["status"].as_str().map(String::from);
        (message, code)
    } else if body.trim().is_empty() {
        (format!("HTTP {status}"), None)
    } else {
        (format!("HTTP {status}: {}", body.trim()), None)
    }
}
