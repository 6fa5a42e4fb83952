//! Host application surface
//!
//! The bridge never owns devices or entities; it talks to the host through
//! these narrow traits. Every handle is optional so the bridge can run
//! standalone or embedded in a host that only cares about some callbacks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// State update pushed to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub device_id: String,
    pub entity_id: String,
    /// Id of the command this event answers, empty for hardware reports
    #[serde(default)]
    pub correlation_id: String,
    pub payload: Value,
}

/// Command issued by the host against one entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostCommand {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl HostCommand {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub version: String,
}

pub trait EventSink: Send + Sync {
    fn emit_event(&self, event: InboundEvent) -> Result<()>;
}

/// Host storage for per-device and per-entity raw configuration
pub trait RawStore: Send + Sync {
    fn write_raw_device(&self, device_id: &str, config: &Value) -> Result<()>;
    fn write_raw_entity(&self, device_id: &str, entity_id: &str, config: &Value) -> Result<()>;
}

/// Registers interest in commands addressed to an entity
pub trait CommandSubscriber: Send + Sync {
    fn subscribe_commands(&self, device_id: &str, entity_id: &str) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct HostHandles {
    pub events: Option<Arc<dyn EventSink>>,
    pub raw: Option<Arc<dyn RawStore>>,
    pub commands: Option<Arc<dyn CommandSubscriber>>,
}

impl HostHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn with_raw_store(mut self, store: Arc<dyn RawStore>) -> Self {
        self.raw = Some(store);
        self
    }

    pub fn with_commands(mut self, subscriber: Arc<dyn CommandSubscriber>) -> Self {
        self.commands = Some(subscriber);
        self
    }

    pub(crate) fn emit(&self, event: InboundEvent) {
        let Some(sink) = &self.events else {
            return;
        };
        let entity_id = event.entity_id.clone();
        if let Err(e) = sink.emit_event(event) {
            tracing::warn!("Failed to emit event for {}: {}", entity_id, e);
        }
    }

    pub(crate) fn write_raw_device(&self, device_id: &str, config: &Value) {
        if let Some(raw) = &self.raw {
            if let Err(e) = raw.write_raw_device(device_id, config) {
                tracing::warn!("Failed to write raw config for device {}: {}", device_id, e);
            }
        }
    }

    pub(crate) fn write_raw_entity(&self, device_id: &str, entity_id: &str, config: &Value) {
        if let Some(raw) = &self.raw {
            if let Err(e) = raw.write_raw_entity(device_id, entity_id, config) {
                tracing::warn!("Failed to write raw config for entity {}: {}", entity_id, e);
            }
        }
    }

    pub(crate) fn subscribe_commands(&self, device_id: &str, entity_id: &str) {
        if let Some(commands) = &self.commands {
            if let Err(e) = commands.subscribe_commands(device_id, entity_id) {
                tracing::warn!("Failed to register commands for {}: {}", entity_id, e);
            }
        }
    }
}

impl std::fmt::Debug for HostHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandles")
            .field("events", &self.events.is_some())
            .field("raw", &self.raw.is_some())
            .field("commands", &self.commands.is_some())
            .finish()
    }
}

/// Writes every event to the log; used when running without a host
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit_event(&self, event: InboundEvent) -> Result<()> {
        if event.correlation_id.is_empty() {
            tracing::info!("{} state: {}", event.entity_id, event.payload);
        } else {
            tracing::info!(
                "{} optimistic state ({}): {}",
                event.entity_id,
                event.correlation_id,
                event.payload
            );
        }
        Ok(())
    }
}
