//! Domain Events and Change Sets
//!
//! Every mutation records the content and location ids it touched in a
//! [`ChangeSet`]. When the surrounding unit of work commits, the change set is
//! handed to the search synchronizer and the content cache, then converted to
//! [`DomainEvent`]s and broadcast to subscribers.
//!
//! # Event Flow
//!
//! 1. A service mutates the working state and records ids in the change set
//! 2. On commit the search index stages documents for the touched ids
//! 3. The content cache drops entries of touched content
//! 4. Domain events are emitted via the broadcast channel
//!
//! A rollback drops the change set together with the working state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Domain events emitted after a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    /// Content was created or any of its versions, metadata or placement changed
    #[serde(rename = "content:changed")]
    ContentChanged { content_id: u64 },

    #[serde(rename = "content:deleted")]
    ContentDeleted { content_id: u64 },

    /// Location was created, moved, hidden, updated or restored
    #[serde(rename = "location:changed")]
    LocationChanged { location_id: u64 },

    /// Location was deleted or moved to the trash
    #[serde(rename = "location:deleted")]
    LocationDeleted { location_id: u64 },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::ContentChanged { .. } => "content:changed",
            DomainEvent::ContentDeleted { .. } => "content:deleted",
            DomainEvent::LocationChanged { .. } => "location:changed",
            DomainEvent::LocationDeleted { .. } => "location:deleted",
        }
    }
}

/// Ids touched by a unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed_contents: BTreeSet<u64>,
    pub deleted_contents: BTreeSet<u64>,
    pub changed_locations: BTreeSet<u64>,
    pub deleted_locations: BTreeSet<u64>,
}

impl ChangeSet {
    pub fn content_changed(&mut self, content_id: u64) {
        if !self.deleted_contents.contains(&content_id) {
            self.changed_contents.insert(content_id);
        }
    }

    pub fn content_deleted(&mut self, content_id: u64) {
        self.changed_contents.remove(&content_id);
        self.deleted_contents.insert(content_id);
    }

    pub fn location_changed(&mut self, location_id: u64) {
        self.deleted_locations.remove(&location_id);
        self.changed_locations.insert(location_id);
    }

    pub fn location_deleted(&mut self, location_id: u64) {
        self.changed_locations.remove(&location_id);
        self.deleted_locations.insert(location_id);
    }

    pub fn is_empty(&self) -> bool {
        self.changed_contents.is_empty()
            && self.deleted_contents.is_empty()
            && self.changed_locations.is_empty()
            && self.deleted_locations.is_empty()
    }

    /// Fold a later change set into this one
    pub fn merge(&mut self, other: ChangeSet) {
        for id in other.deleted_contents {
            self.content_deleted(id);
        }
        for id in other.changed_contents {
            self.content_changed(id);
        }
        for id in other.deleted_locations {
            self.location_deleted(id);
        }
        for id in other.changed_locations {
            self.location_changed(id);
        }
    }

    /// Content ids whose cached or indexed representation is stale
    pub fn touched_contents(&self) -> impl Iterator<Item = u64> + '_ {
        self.changed_contents
            .iter()
            .chain(self.deleted_contents.iter())
            .copied()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        events.extend(
            self.changed_contents
                .iter()
                .map(|&content_id| DomainEvent::ContentChanged { content_id }),
        );
        events.extend(
            self.deleted_contents
                .iter()
                .map(|&content_id| DomainEvent::ContentDeleted { content_id }),
        );
        events.extend(
            self.changed_locations
                .iter()
                .map(|&location_id| DomainEvent::LocationChanged { location_id }),
        );
        events.extend(
            self.deleted_locations
                .iter()
                .map(|&location_id| DomainEvent::LocationDeleted { location_id }),
        );
        events
    }
}
