//! Discovered-entity store
//!
//! Holds every [`DiscoveredEntity`] keyed by `unique_id`. All mutations are
//! single map operations under one lock, so a failed message can never leave
//! the map half-updated. The lock is never held while calling out.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::Result;
use crate::model::DiscoveredEntity;

/// What an [`ReconciliationStore::upsert`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// The stored record was already identical
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ReconciliationStore {
    entities: RwLock<HashMap<String, DiscoveredEntity>>,
}

impl ReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted blob
    ///
    /// An absent, empty, `null` or malformed blob yields an empty store.
    pub fn restore(blob: Option<&[u8]>) -> Self {
        let store = Self::new();
        let Some(blob) = blob else {
            return store;
        };
        if blob.iter().all(u8::is_ascii_whitespace) {
            return store;
        }

        match serde_json::from_slice::<Option<HashMap<String, DiscoveredEntity>>>(blob) {
            Ok(Some(entities)) => {
                tracing::debug!("Restored {} discovered entities", entities.len());
                *store.entities.write() = entities;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Ignoring malformed discovery storage blob: {}", e);
            }
        }
        store
    }

    /// Serialize every entity as a JSON object keyed by `unique_id`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let entities = self.entities.read();
        let ordered: BTreeMap<&str, &DiscoveredEntity> =
            entities.iter().map(|(k, v)| (k.as_str(), v)).collect();
        Ok(serde_json::to_vec(&ordered)?)
    }

    /// Insert or overwrite the record for `entity.unique_id`
    pub fn upsert(&self, entity: DiscoveredEntity) -> UpsertOutcome {
        let mut entities = self.entities.write();
        match entities.get(&entity.unique_id) {
            Some(existing) if *existing == entity => UpsertOutcome::Unchanged,
            Some(_) => {
                entities.insert(entity.unique_id.clone(), entity);
                UpsertOutcome::Updated
            }
            None => {
                entities.insert(entity.unique_id.clone(), entity);
                UpsertOutcome::Inserted
            }
        }
    }

    pub fn get(&self, unique_id: &str) -> Option<DiscoveredEntity> {
        self.entities.read().get(unique_id).cloned()
    }

    pub fn delete(&self, unique_id: &str) -> Option<DiscoveredEntity> {
        self.entities.write().remove(unique_id)
    }

    /// Remove every entity belonging to a host device id
    pub fn delete_device(&self, device_id: &str) -> Vec<DiscoveredEntity> {
        let mut entities = self.entities.write();
        let doomed: Vec<String> = entities
            .values()
            .filter(|e| e.device_id() == device_id)
            .map(|e| e.unique_id.clone())
            .collect();

        doomed
            .iter()
            .filter_map(|unique_id| entities.remove(unique_id))
            .collect()
    }

    /// Remove the entity with the given host ids
    pub fn delete_entity(&self, device_id: &str, entity_id: &str) -> Option<DiscoveredEntity> {
        let mut entities = self.entities.write();
        let unique_id = entities
            .values()
            .find(|e| e.device_id() == device_id && e.entity_id() == entity_id)
            .map(|e| e.unique_id.clone())?;
        entities.remove(&unique_id)
    }

    /// Entities grouped under a device key, sorted by `unique_id`
    pub fn list_by_device(&self, device_key: &str) -> Vec<DiscoveredEntity> {
        let mut matches: Vec<DiscoveredEntity> = self
            .entities
            .read()
            .values()
            .filter(|e| e.device_key == device_key)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        matches
    }

    /// Look up an entity by its host entity id
    pub fn find_by_entity_id(&self, entity_id: &str) -> Option<DiscoveredEntity> {
        self.entities
            .read()
            .values()
            .find(|e| e.entity_id() == entity_id)
            .cloned()
    }

    /// A sorted copy of every entity
    pub fn snapshot(&self) -> Vec<DiscoveredEntity> {
        let mut all: Vec<DiscoveredEntity> = self.entities.read().values().cloned().collect();
        all.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        all
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}
