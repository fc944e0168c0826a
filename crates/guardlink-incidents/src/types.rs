//! Incident records, events and filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    /// A guard or member of the public called in an emergency.
    EmergencyCall,
    /// A guard is missing selfie checks.
    SelfieNonCompliance,
    /// Unauthorised entry or suspicious activity.
    Intrusion,
    /// Anything else.
    Other,
}

/// How urgent. Ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    /// Informational.
    Low,
    /// Needs attention this shift.
    Medium,
    /// Needs attention now.
    High,
    /// Life or property at immediate risk.
    Critical,
}

/// Where the incident is in its handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Reported, nobody assigned.
    Open,
    /// Someone is on it.
    Investigating,
    /// Closed out.
    Resolved,
}

/// A reported incident.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Time-ordered id (UUID v7).
    pub id: Uuid,
    /// Site name.
    pub site: String,
    /// Guard involved, if any.
    pub guard_id: Option<String>,
    /// Category.
    pub kind: IncidentKind,
    /// Urgency.
    pub severity: IncidentSeverity,
    /// Handling state.
    pub status: IncidentStatus,
    /// Free-text description as reported.
    pub description: String,
    /// Model-generated summary, once attached.
    pub summary: Option<String>,
    /// When it was reported.
    pub reported_at: DateTime<Utc>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when reporting.
#[derive(Clone, Debug)]
pub struct NewIncident {
    /// Site name.
    pub site: String,
    /// Guard involved, if any.
    pub guard_id: Option<String>,
    /// Category.
    pub kind: IncidentKind,
    /// Urgency.
    pub severity: IncidentSeverity,
    /// Free-text description.
    pub description: String,
}

/// A store mutation, as seen by subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncidentEvent {
    /// A new incident was reported.
    Reported(Incident),
    /// An incident's status or summary changed.
    Updated(Incident),
    /// The store shut down. No events follow.
    Closed,
}

/// Criteria for [`IncidentStore::list`](crate::IncidentStore::list). Empty matches all.
#[derive(Clone, Debug, Default)]
pub struct IncidentFilter {
    /// Only this status.
    pub status: Option<IncidentStatus>,
    /// Only this severity or worse.
    pub min_severity: Option<IncidentSeverity>,
    /// Only this site (exact match).
    pub site: Option<String>,
    /// Only this guard.
    pub guard_id: Option<String>,
}

impl IncidentFilter {
    /// Whether `incident` satisfies every set criterion.
    pub fn matches(&self, incident: &Incident) -> bool {
        self.status.is_none_or(|s| incident.status == s)
            && self.min_severity.is_none_or(|s| incident.severity >= s)
            && self.site.as_ref().is_none_or(|s| &incident.site == s)
            && self
                .guard_id
                .as_ref()
                .is_none_or(|g| incident.guard_id.as_ref() == Some(g))
    }
}
