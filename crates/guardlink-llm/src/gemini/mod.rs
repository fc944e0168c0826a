//! Google Generative Language (Gemini) client.
//!
//! - [`types`]: request/response wire types and [`GeminiConfig`]
//! - [`provider`]: [`GeminiClient`], the [`ModelClient`](crate::ModelClient) implementation

pub mod provider;
pub mod types;

pub use provider::GeminiClient;
pub use types::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig};
