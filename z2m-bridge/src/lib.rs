//! # z2m Bridge
//!
//! Bridges Home-Assistant-style MQTT discovery (as published by zigbee2mqtt)
//! into a host application's device/entity graph.
//!
//! ## Architecture
//!
//! ```text
//! discovery topic ─► parse ─► ReconciliationStore ─► wire once ─► TopicFanout(state topic)
//!                                   │                                   │
//!                 host list calls ◄─┘              state message ─► decode ─► EventSink
//!
//! host command ─► CommandRouter ─► encode ─► publish ─► optimistic echo ─► EventSink
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use z2m_bridge::{Bridge, BridgeConfig, HostHandles, LogEventSink};
//!
//! let config = BridgeConfig::from_env();
//! let host = HostHandles::new().with_events(Arc::new(LogEventSink));
//! let bridge = Bridge::new(config, host, None);
//!
//! bridge.start().await?;
//! // ... serve host callbacks ...
//! let blob = bridge.storage_blob()?;
//! bridge.shutdown().await;
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod router;
pub mod settle;

// ============================================================================
// Lifecycle
// ============================================================================

pub use bridge::{Bridge, Health, StartOutcome, PLUGIN_ID, PLUGIN_NAME};
pub use config::{default_discovery_topic, BridgeConfig, SettleConfig};
pub use error::{BridgeError, Result};

// ============================================================================
// Host surface
// ============================================================================

pub use host::{
    CommandSubscriber, EventSink, HostCommand, HostHandles, InboundEvent, LogEventSink, Manifest,
    RawStore,
};

// ============================================================================
// Components
// ============================================================================

pub use router::CommandRouter;
pub use settle::{DiscoverySettle, SettlePhase, SettleReason, SettleState};

// Re-export commonly used types from the component crates
pub use z2m_event_manager::{MemoryClient, MqttClient, RumqttClient};
pub use z2m_state::{Device, Entity, EntityData, SyncStatus};
