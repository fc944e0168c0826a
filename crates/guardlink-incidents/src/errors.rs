//! Store errors.

use uuid::Uuid;

/// Errors returned by [`IncidentStore`](crate::IncidentStore).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No incident has this id.
    #[error("incident {0} not found")]
    NotFound(Uuid),
    /// The store was shut down; it no longer accepts mutations.
    #[error("incident store is shut down")]
    ShutDown,
}
