//! # guardlink-flows
//!
//! The three prompt flows and the façade the rest of the application calls.
//!
//! Each flow is a [`FlowDefinition`]: input schema, output schema and prompt
//! template, checked once at construction. An invocation renders the
//! prompt, makes exactly one model call and validates the response. Failures
//! surface immediately as a [`FlowError`](guardlink_core::FlowError); wrap a
//! façade call in [`with_retry`] to opt into retries.

#![deny(unsafe_code)]

pub mod definition;
pub mod flows;
pub mod retry;
pub mod selfie_compliance;
pub mod selfie_message;
pub mod summarize_call;

pub use definition::{FlowDefinition, InvokeOptions, Stage};
pub use flows::Flows;
pub use retry::{RetryPolicy, with_retry};
pub use selfie_compliance::{ComplianceInput, ComplianceOutput};
pub use selfie_message::{MessageInput, MessageOutput};
pub use summarize_call::{SummarizeCallInput, SummarizeCallOutput};
