//! Host-owned device and entity records
//!
//! The host persists these and hands them back on every list call. Only the
//! fields reconciliation touches are modelled; `local_name` belongs to the
//! user and is never overwritten from hardware data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub local_name: String,
}

/// Whether the host's view of an entity matches the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Unknown,
    /// A command was published and the hardware has not confirmed it yet
    Pending,
    InSync,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityData {
    /// Last state reported by the hardware
    #[serde(default)]
    pub reported: Option<Value>,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub local_name: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub data: EntityData,
}

impl Entity {
    pub fn new(id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            ..Default::default()
        }
    }
}
