//! Saved ("kept") events, persisted as one JSON array in a [`KvStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::Result;
use crate::event::Event;
use crate::storage::KvStore;

/// Key the saved list lives under.
pub const SAVED_EVENTS_KEY: &str = "saved_events";

/// Snapshot of an event at save time plus the user's interest level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub interest: u8,
    pub saved_at: DateTime<Utc>,
}

impl SavedEvent {
    pub fn id(&self) -> &str {
        &self.event.id
    }
}

/// The saved-events list. Ids are unique.
///
/// The in-memory list is authoritative for the session; every mutation
/// writes the whole array back and a failed write is logged, not fatal.
pub struct SavedEvents<S: KvStore> {
    store: S,
    items: Vec<SavedEvent>,
}

impl<S: KvStore> SavedEvents<S> {
    /// Read the list from `store`.
    ///
    /// Content that is not a JSON array is treated as empty and the key is
    /// reset. Elements that do not decode are dropped.
    pub fn load(store: S) -> Self {
        let raw = match store.get(SAVED_EVENTS_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "failed to read saved events");
                None
            }
        };

        let items = match raw.as_deref().map(serde_json::from_str::<serde_json::Value>) {
            None => Vec::new(),
            Some(Ok(serde_json::Value::Array(values))) => {
                let mut items: Vec<SavedEvent> = Vec::with_capacity(values.len());
                for value in values {
                    match serde_json::from_value::<SavedEvent>(value) {
                        Ok(item) if !items.iter().any(|i| i.id() == item.id()) => items.push(item),
                        Ok(item) => warn!(id = %item.id(), "dropping duplicate saved event"),
                        Err(err) => warn!(error = %err, "dropping undecodable saved event"),
                    }
                }
                items
            }
            Some(_) => {
                warn!("saved events are not a JSON array, resetting");
                if let Err(err) = store.set(SAVED_EVENTS_KEY, "[]") {
                    error!(error = %err, "failed to reset saved events");
                }
                Vec::new()
            }
        };

        Self { store, items }
    }

    pub fn list(&self) -> &[SavedEvent] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&SavedEvent> {
        self.items.iter().find(|i| i.id() == id)
    }

    /// Save `event` unless its id is already saved. An existing entry keeps
    /// its original interest. Returns whether a new entry was added.
    pub fn insert_if_absent(&mut self, event: &Event, interest: u8, saved_at: DateTime<Utc>) -> bool {
        if self.contains(&event.id) {
            return false;
        }
        self.items.push(SavedEvent {
            event: event.clone(),
            interest: interest.min(100),
            saved_at,
        });
        self.persist_logged();
        true
    }

    /// Delete a saved event. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id() != id);
        let removed = self.items.len() != before;
        if removed {
            self.persist_logged();
        }
        removed
    }

    /// Delete every saved event.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist_logged();
    }

    /// Write the list back to the store.
    ///
    /// # Errors
    /// Returns an error if encoding or the store write fails.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.items)?;
        self.store.set(SAVED_EVENTS_KEY, &json)
    }

    fn persist_logged(&self) {
        if let Err(err) = self.persist() {
            error!(error = %err, count = self.items.len(), "failed to persist saved events");
        }
    }
}

/// One-line message for sharing an event.
pub fn share_text(event: &Event, event_base_url: &str) -> String {
    format!("鹿児島のイベント: {} {}{}", event.title, event_base_url, event.id)
}
