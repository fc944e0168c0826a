//! Scripted model client for deterministic tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use guardlink_core::FlowError;
use parking_lot::Mutex;
use serde_json::Value;

use crate::client::{ModelClient, ModelRequest, ModelResponse};

/// Pre-programmed responses, served one per call in order.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this raw text.
    Text(String),
    /// Return this value serialised as JSON text.
    Json(Value),
    /// Fail with this error.
    Error(FlowError),
    /// Wait, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    /// Wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Model client returning scripted responses.
pub struct MockModelClient {
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModelClient {
    /// Client that serves `responses` in order.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Client that answers every call with the same value.
    pub fn repeating(value: &Value, times: usize) -> Self {
        Self::new(vec![MockResponse::Json(value.clone()); times])
    }

    /// Number of `generate` calls so far, including failed ones.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every prompt received, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, FlowError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push(request.prompt.to_string());

        let Some(response) = self.responses.get(idx) else {
            return Err(FlowError::transport(format!(
                "MockModelClient: no response configured for call {idx}"
            )));
        };

        // Nested delays are unrolled iteratively.
        let mut current = response;
        loop {
            match current {
                MockResponse::Text(text) => return Ok(self.reply(text.clone())),
                MockResponse::Json(value) => return Ok(self.reply(value.to_string())),
                MockResponse::Error(e) => return Err(e.clone()),
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(*duration).await;
                    current = inner;
                }
            }
        }
    }
}

impl MockModelClient {
    fn reply(&self, text: String) -> ModelResponse {
        ModelResponse {
            text,
            model: self.model().to_string(),
            usage: None,
        }
    }
}
