//! # guardlink-llm
//!
//! The boundary to the external generative model.
//!
//! - [`ModelClient`]: one prompt in, one text response out, no retries, no caching
//! - [`GeminiClient`]: `generateContent` over HTTP with structured-output mode
//! - [`parse_record`]: turns response text into a schema-checked [`FlowRecord`]
//! - [`MockModelClient`]: scripted responses for tests
//!
//! [`FlowRecord`]: guardlink_core::FlowRecord

#![deny(unsafe_code)]

pub mod client;
pub mod gemini;
pub mod mock;
pub mod output;

pub use client::{ModelClient, ModelRequest, ModelResponse, TokenUsage};
pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::{MockModelClient, MockResponse};
pub use output::parse_record;
