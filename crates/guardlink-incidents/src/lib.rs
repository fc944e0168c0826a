//! # guardlink-incidents
//!
//! An explicit incident store with a defined lifecycle:
//!
//! 1. construct with [`IncidentStore::new`]
//! 2. [`subscribe`](IncidentStore::subscribe) to mutations
//! 3. report, update and read incidents
//! 4. [`shutdown`](IncidentStore::shutdown): subscribers see
//!    [`IncidentEvent::Closed`] and further mutations fail
//!
//! Nothing is persisted. Dropping the store drops its incidents.

#![deny(unsafe_code)]

pub mod errors;
pub mod store;
pub mod types;

pub use errors::StoreError;
pub use store::IncidentStore;
pub use types::{
    Incident, IncidentEvent, IncidentFilter, IncidentKind, IncidentSeverity, IncidentStatus,
    NewIncident,
};
