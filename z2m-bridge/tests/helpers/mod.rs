//! Shared fixtures for bridge integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use z2m_bridge::{
    Bridge, BridgeConfig, CommandSubscriber, EventSink, HostHandles, InboundEvent, MemoryClient,
    MqttClient, RawStore, StartOutcome,
};

// ============================================================================
// Recording host
// ============================================================================

/// Host double that records every callback
#[derive(Default)]
pub struct RecordingHost {
    pub events: Mutex<Vec<InboundEvent>>,
    pub raw_devices: Mutex<Vec<(String, Value)>>,
    pub raw_entities: Mutex<Vec<(String, String, Value)>>,
    pub command_subscriptions: Mutex<Vec<(String, String)>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handles(self: &Arc<Self>) -> HostHandles {
        HostHandles::new()
            .with_events(self.clone())
            .with_raw_store(self.clone())
            .with_commands(self.clone())
    }

    pub fn events(&self) -> Vec<InboundEvent> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, entity_id: &str) -> Vec<InboundEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub fn command_subscriptions(&self) -> Vec<(String, String)> {
        self.command_subscriptions.lock().clone()
    }
}

impl EventSink for RecordingHost {
    fn emit_event(&self, event: InboundEvent) -> z2m_bridge::Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

impl RawStore for RecordingHost {
    fn write_raw_device(&self, device_id: &str, config: &Value) -> z2m_bridge::Result<()> {
        self.raw_devices
            .lock()
            .push((device_id.to_string(), config.clone()));
        Ok(())
    }

    fn write_raw_entity(
        &self,
        device_id: &str,
        entity_id: &str,
        config: &Value,
    ) -> z2m_bridge::Result<()> {
        self.raw_entities.lock().push((
            device_id.to_string(),
            entity_id.to_string(),
            config.clone(),
        ));
        Ok(())
    }
}

impl CommandSubscriber for RecordingHost {
    fn subscribe_commands(&self, device_id: &str, entity_id: &str) -> z2m_bridge::Result<()> {
        self.command_subscriptions
            .lock()
            .push((device_id.to_string(), entity_id.to_string()));
        Ok(())
    }
}

// ============================================================================
// Discovery fixtures
// ============================================================================

pub const DISCOVERY_TOPIC: &str = "homeassistant/#";

pub fn config() -> BridgeConfig {
    BridgeConfig {
        discovery_topic: DISCOVERY_TOPIC.to_string(),
        ..Default::default()
    }
}

/// A zigbee2mqtt-style light discovery message
pub fn light(unique_id: &str, device_key: &str, state_topic: &str) -> (String, String) {
    let topic = format!("homeassistant/light/{device_key}/{unique_id}/config");
    let payload = json!({
        "unique_id": unique_id,
        "name": format!("{unique_id} light"),
        "device": {
            "identifiers": [device_key],
            "name": format!("{device_key} bulb"),
            "model": "LED1545G12",
            "manufacturer": "IKEA"
        },
        "state_topic": state_topic,
        "command_topic": format!("{state_topic}/set"),
        "payload_on": "ON",
        "payload_off": "OFF",
        "value_template": "{{ value_json.state }}"
    });
    (topic, payload.to_string())
}

/// A sensor reading a nested value
pub fn sensor(unique_id: &str, device_key: &str, state_topic: &str, template: &str) -> (String, String) {
    let topic = format!("homeassistant/sensor/{device_key}/{unique_id}/config");
    let payload = json!({
        "unique_id": unique_id,
        "device": {"identifiers": [device_key]},
        "state_topic": state_topic,
        "value_template": template
    });
    (topic, payload.to_string())
}

// ============================================================================
// Async helpers
// ============================================================================

pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}

/// A bridge started against an in-memory broker
pub async fn started_bridge(host: &Arc<RecordingHost>) -> (Arc<MemoryClient>, Bridge) {
    started_bridge_with(host, config(), None).await
}

pub async fn started_bridge_with(
    host: &Arc<RecordingHost>,
    config: BridgeConfig,
    stored: Option<&[u8]>,
) -> (Arc<MemoryClient>, Bridge) {
    let client = Arc::new(MemoryClient::new());
    let bridge = Bridge::new(config, host.handles(), stored);
    let outcome = bridge.start_with_client(client.clone()).await.unwrap();
    assert!(matches!(outcome, StartOutcome::Ready(_)));
    assert!(client.is_connected());
    (client, bridge)
}
