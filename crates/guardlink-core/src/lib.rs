//! # guardlink-core
//!
//! Shared vocabulary for the GuardLink prompt flows:
//!
//! - **Schemas**: [`Schema`] / [`FieldSpec`] declare a record's required fields
//!   and primitive types, and shape-check untrusted model output at runtime
//! - **Records**: [`FlowRecord`] ties a typed struct to its schema
//! - **Templates**: [`PromptTemplate`] parses `{{ field }}` placeholders and
//!   renders them from a record's fields
//! - **Errors**: [`FlowError`], the taxonomy every flow failure maps onto

#![deny(unsafe_code)]

pub mod errors;
pub mod record;
pub mod schema;
pub mod template;

pub use errors::{FlowError, Violation};
pub use record::FlowRecord;
pub use schema::{FieldSpec, FieldType, Schema};
pub use template::PromptTemplate;
