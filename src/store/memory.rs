//! In-memory event source for embedders and tests.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::core::errors::{FmError, Result};
use crate::store::events::{EventSnapshot, EventSource, FulfillmentEvent};

/// Event source backed by a plain vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    events: Vec<FulfillmentEvent>,
    assignees: HashMap<i64, String>,
    outage: Option<String>,
}

impl MemoryEventSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: FulfillmentEvent) {
        self.events.push(event);
    }

    /// Register a display name for an assignee id.
    pub fn add_assignee(&mut self, id: i64, name: impl Into<String>) {
        self.assignees.insert(id, name.into());
    }

    /// Make every subsequent read fail as if the store were unreachable.
    pub fn set_outage(&mut self, details: impl Into<String>) {
        self.outage = Some(details.into());
    }
}

impl FromIterator<FulfillmentEvent> for MemoryEventSource {
    fn from_iter<I: IntoIterator<Item = FulfillmentEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl EventSource for MemoryEventSource {
    fn snapshot(&self, lower_bound: DateTime<Utc>) -> Result<EventSnapshot> {
        if let Some(details) = &self.outage {
            return Err(FmError::StoreUnavailable {
                path: PathBuf::from(":memory:"),
                details: details.clone(),
            });
        }

        let events: Vec<FulfillmentEvent> = self
            .events
            .iter()
            .filter(|e| e.assigned_at >= lower_bound)
            .cloned()
            .collect();
        let assignees = events
            .iter()
            .filter_map(|e| e.assignee_id)
            .filter_map(|id| self.assignees.get(&id).map(|name| (id, name.clone())))
            .collect();

        Ok(EventSnapshot { events, assignees })
    }
}
