use tracing::{debug, warn};

use crate::events::{Event, SYSTEM_CREATED, SYSTEM_REMOVED, SYSTEM_UPDATED};
use crate::models::System;

/// Subscriber key the console registers the catalog under.
pub const CATALOG_SUBSCRIBER: &str = "global_systems";

/// Effect of one event on the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogChange {
    Added(String),
    Removed(String),
    Replaced(String),
    /// Create for an id already present.
    DuplicateCreate(String),
    /// Remove or update for an id not present.
    UnknownId(String),
    /// Not a system event, or a payload without a usable id.
    Ignored,
}

/// The known systems, unique by id. Iteration order carries no meaning.
#[derive(Debug, Clone, Default)]
pub struct SystemCatalog {
    systems: Vec<System>,
}

impl SystemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a fresh fetch. Later duplicates of an id win.
    pub fn replace_all(&mut self, systems: Vec<System>) {
        self.systems.clear();
        for system in systems {
            self.remove(&system.id);
            self.systems.push(system);
        }
        debug!(count = self.systems.len(), "Loaded system catalog");
    }

    pub fn clear(&mut self) {
        self.systems.clear();
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &System> {
        self.systems.iter()
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    pub fn find_by_id(&self, id: &str) -> Option<&System> {
        self.systems.iter().find(|s| s.id == id)
    }

    pub fn find(&self, name: &str, version: &str) -> Option<&System> {
        self.systems
            .iter()
            .find(|s| s.name == name && s.version == version)
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.systems.len();
        self.systems.retain(|s| s.id != id);
        self.systems.len() != before
    }

    /// Reconcile one event into the catalog.
    pub fn apply(&mut self, event: &Event) -> CatalogChange {
        if !event.is_system_event() {
            return CatalogChange::Ignored;
        }
        let Some(id) = event.payload_id() else {
            warn!(event = %event.name, "System event without an id");
            return CatalogChange::Ignored;
        };
        let exists = self.find_by_id(&id).is_some();

        let change = match event.name.as_str() {
            SYSTEM_CREATED if exists => CatalogChange::DuplicateCreate(id),
            SYSTEM_CREATED => match self.decode(event) {
                Some(system) => {
                    self.systems.push(system);
                    CatalogChange::Added(id)
                }
                None => CatalogChange::Ignored,
            },
            SYSTEM_REMOVED if exists => {
                self.remove(&id);
                CatalogChange::Removed(id)
            }
            SYSTEM_UPDATED if exists => match self.decode(event) {
                Some(system) => {
                    self.remove(&id);
                    self.systems.push(system);
                    CatalogChange::Replaced(id)
                }
                None => CatalogChange::Ignored,
            },
            _ => CatalogChange::UnknownId(id),
        };

        debug!(event = %event.name, change = ?change, "Reconciled system event");
        change
    }

    fn decode(&self, event: &Event) -> Option<System> {
        match serde_json::from_value(event.payload.clone()) {
            Ok(system) => Some(system),
            Err(e) => {
                warn!(event = %event.name, error = %e, "Dropping undecodable system payload");
                None
            }
        }
    }
}
