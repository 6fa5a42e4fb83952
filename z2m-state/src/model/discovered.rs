//! Persisted projection of a discovery message

use serde::{Deserialize, Serialize};
use z2m_discovery::DiscoveryRecord;

use crate::ids;

/// One discovered entity, keyed by `unique_id`
///
/// This is the unit written to and read from the storage blob, so field names
/// are part of the persisted format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscoveredEntity {
    pub unique_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_name: String,
    /// Device grouping key; empty when discovery supplied no identifiers
    #[serde(default)]
    pub device_key: String,
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub state_topic: String,
    #[serde(default)]
    pub command_topic: String,
    #[serde(default)]
    pub payload_on: String,
    #[serde(default)]
    pub payload_off: String,
    #[serde(default)]
    pub value_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub manufacturer: String,
}

impl DiscoveredEntity {
    pub fn is_device_groupable(&self) -> bool {
        !self.device_key.is_empty()
    }

    pub fn device_id(&self) -> String {
        ids::device_id(&self.device_key)
    }

    pub fn entity_id(&self) -> String {
        ids::entity_id(&self.unique_id)
    }

    /// Device display name from hardware, falling back to the device key
    pub fn device_source_name(&self) -> &str {
        let name = self.device_name.trim();
        if name.is_empty() {
            &self.device_key
        } else {
            name
        }
    }

    /// Entity display name from hardware, falling back to the unique id
    pub fn source_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            &self.unique_id
        } else {
            name
        }
    }
}

impl From<&DiscoveryRecord> for DiscoveredEntity {
    fn from(record: &DiscoveryRecord) -> Self {
        Self {
            unique_id: record.unique_id.clone(),
            name: record.name.clone(),
            device_name: record.device_name.clone(),
            device_key: record.device_identifier.clone(),
            entity_type: record.entity_type_hint.clone(),
            state_topic: record.state_topic.clone(),
            command_topic: record.command_topic.clone(),
            payload_on: record.payload_on.clone(),
            payload_off: record.payload_off.clone(),
            value_key: record.value_template_path.clone(),
            model: record.device_model.clone(),
            manufacturer: record.device_manufacturer.clone(),
        }
    }
}

impl From<DiscoveryRecord> for DiscoveredEntity {
    fn from(record: DiscoveryRecord) -> Self {
        Self::from(&record)
    }
}
