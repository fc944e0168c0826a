//! The incident store.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::types::{Incident, IncidentEvent, IncidentFilter, IncidentStatus, NewIncident};

struct State {
    incidents: HashMap<Uuid, Incident>,
    shut_down: bool,
}

/// In-memory incident store.
///
/// Mutations take a write lock, apply the change and publish the event
/// before releasing it, so subscribers see events in mutation order.
pub struct IncidentStore {
    state: RwLock<State>,
    events: broadcast::Sender<IncidentEvent>,
}

impl IncidentStore {
    /// Create an empty store. `capacity` bounds how many events a slow
    /// subscriber may lag behind before it starts missing them.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(State {
                incidents: HashMap::new(),
                shut_down: false,
            }),
            events,
        }
    }

    /// Receive every mutation from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<IncidentEvent> {
        self.events.subscribe()
    }

    /// Record a new incident with status [`IncidentStatus::Open`].
    pub fn report(&self, new: NewIncident) -> Result<Incident, StoreError> {
        let mut state = self.state.write();
        if state.shut_down {
            return Err(StoreError::ShutDown);
        }

        let now = Utc::now();
        let incident = Incident {
            id: Uuid::now_v7(),
            site: new.site,
            guard_id: new.guard_id,
            kind: new.kind,
            severity: new.severity,
            status: IncidentStatus::Open,
            description: new.description,
            summary: None,
            reported_at: now,
            updated_at: now,
        };
        let _ = state.incidents.insert(incident.id, incident.clone());
        info!(
            incident_id = %incident.id,
            site = %incident.site,
            kind = ?incident.kind,
            severity = ?incident.severity,
            "incident reported"
        );
        self.publish(IncidentEvent::Reported(incident.clone()));
        Ok(incident)
    }

    /// Move an incident to `status`. Setting the current status is a no-op.
    pub fn update_status(&self, id: Uuid, status: IncidentStatus) -> Result<Incident, StoreError> {
        self.mutate(id, |incident| {
            if incident.status == status {
                return false;
            }
            debug!(
                incident_id = %id,
                from = ?incident.status,
                to = ?status,
                "incident status changed"
            );
            incident.status = status;
            true
        })
    }

    /// Record a call summary against an incident, replacing any earlier one.
    pub fn attach_summary(
        &self,
        id: Uuid,
        summary: impl Into<String>,
    ) -> Result<Incident, StoreError> {
        let summary = summary.into();
        self.mutate(id, move |incident| {
            debug!(incident_id = %id, summary_len = summary.len(), "summary attached");
            incident.summary = Some(summary);
            true
        })
    }

    /// Look up one incident. Reads keep working after shutdown.
    pub fn get(&self, id: Uuid) -> Result<Incident, StoreError> {
        self.state
            .read()
            .incidents
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Incidents matching `filter`, newest first.
    pub fn list(&self, filter: &IncidentFilter) -> Vec<Incident> {
        let state = self.state.read();
        let mut incidents: Vec<Incident> = state
            .incidents
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        incidents.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        incidents
    }

    /// Number of incidents held.
    pub fn len(&self) -> usize {
        self.state.read().incidents.len()
    }

    /// Whether the store holds no incidents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`IncidentStore::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.state.read().shut_down
    }

    /// Stop accepting mutations and tell subscribers. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.state.write();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        info!(incidents = state.incidents.len(), "incident store shut down");
        self.publish(IncidentEvent::Closed);
    }

    fn mutate(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut Incident) -> bool,
    ) -> Result<Incident, StoreError> {
        let mut state = self.state.write();
        if state.shut_down {
            return Err(StoreError::ShutDown);
        }
        let incident = state
            .incidents
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        if !apply(incident) {
            return Ok(incident.clone());
        }
        incident.updated_at = Utc::now();
        let updated = incident.clone();
        self.publish(IncidentEvent::Updated(updated.clone()));
        Ok(updated)
    }

    fn publish(&self, event: IncidentEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for IncidentStore {
    fn default() -> Self {
        Self::new(256)
    }
}
