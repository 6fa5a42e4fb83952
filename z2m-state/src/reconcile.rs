//! Projection of discovered entities onto the host's device and entity lists
//!
//! # The Wall
//!
//! Hardware data may refresh `source_*` fields but never a user's
//! `local_name`. Host records absent from discovery ("ghosts", e.g. unplugged
//! hardware) are returned untouched; only explicit deletion removes them.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::model::{DiscoveredEntity, Device, Domain, Entity};

/// Merge a hardware projection into an existing host device
///
/// Source fields come from `discovered`; `local_name` comes from `existing`.
/// A device seen for the first time takes its source name as local name.
pub fn reconcile_device(existing: Option<&Device>, discovered: Device) -> Device {
    match existing {
        Some(existing) => Device {
            id: existing.id.clone(),
            source_id: discovered.source_id,
            source_name: discovered.source_name,
            local_name: existing.local_name.clone(),
        },
        None => Device {
            local_name: discovered.source_name.clone(),
            ..discovered
        },
    }
}

fn device_projection(entity: &DiscoveredEntity) -> Device {
    Device {
        id: entity.device_id(),
        source_id: entity.device_key.clone(),
        source_name: entity.device_source_name().to_string(),
        local_name: String::new(),
    }
}

/// Reconcile the host's device list against discovery, sorted by id
///
/// Entities without a device key are not groupable and are skipped.
pub fn reconcile_devices(discovered: &[DiscoveredEntity], current: Vec<Device>) -> Vec<Device> {
    let mut by_id: BTreeMap<String, Device> = current
        .into_iter()
        .map(|device| (device.id.clone(), device))
        .collect();

    for entity in discovered.iter().filter(|e| e.is_device_groupable()) {
        let projection = device_projection(entity);
        let merged = reconcile_device(by_id.get(&projection.id), projection);
        by_id.insert(merged.id.clone(), merged);
    }

    tracing::debug!(
        "Reconciled {} devices from {} discovered entities",
        by_id.len(),
        discovered.len()
    );
    by_id.into_values().collect()
}

/// Reconcile one device's entity list against discovery, sorted by id
///
/// Existing entities keep their `local_name` and `data`; capabilities are
/// only replaced when the derived set differs.
pub fn reconcile_entities(
    device_id: &str,
    discovered: &[DiscoveredEntity],
    current: Vec<Entity>,
) -> Vec<Entity> {
    let mut by_id: BTreeMap<String, Entity> = current
        .into_iter()
        .map(|entity| (entity.id.clone(), entity))
        .collect();

    let owned = discovered
        .iter()
        .filter(|e| e.is_device_groupable() && e.device_id() == device_id);

    for found in owned {
        let entity_id = found.entity_id();
        let domain = Domain::from_hint(&found.entity_type);
        let capabilities: Vec<String> =
            domain.capabilities().iter().map(|c| c.to_string()).collect();
        let source_name = found.source_name().to_string();

        let merged = match by_id.remove(&entity_id) {
            Some(mut existing) => {
                existing.device_id = device_id.to_string();
                existing.domain = domain.to_string();
                existing.source_name = source_name;
                if existing.capabilities != capabilities {
                    existing.capabilities = capabilities;
                }
                existing
            }
            None => Entity {
                id: entity_id.clone(),
                device_id: device_id.to_string(),
                domain: domain.to_string(),
                local_name: source_name.clone(),
                source_name,
                capabilities,
                ..Default::default()
            },
        };
        by_id.insert(entity_id, merged);
    }

    by_id.into_values().collect()
}

/// Raw device configuration handed to the host
pub fn device_raw_config(entity: &DiscoveredEntity) -> Value {
    json!({
        "device_key": entity.device_key,
        "device_name": entity.device_name,
        "model": entity.model,
        "manufacturer": entity.manufacturer,
    })
}

/// Raw entity configuration handed to the host
pub fn entity_raw_config(entity: &DiscoveredEntity) -> Value {
    json!({
        "state_topic": entity.state_topic,
        "command_topic": entity.command_topic,
        "payload_on": entity.payload_on,
        "payload_off": entity.payload_off,
        "value_key": entity.value_key,
    })
}
