//! # z2m Event Manager
//!
//! Broker plumbing for the bridge: a narrow async [`MqttClient`] seam, a
//! `rumqttc` implementation of it, and [`TopicFanout`], which subscribes to
//! each state topic once no matter how many entities listen on it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use z2m_event_manager::{ClientConfig, MqttClient, RumqttClient, TopicFanout};
//!
//! let config = ClientConfig::from_url("tcp://localhost:1883")?;
//! let client: Arc<dyn MqttClient> = Arc::new(RumqttClient::new(config));
//! client.connect().await?;
//!
//! let fanout = TopicFanout::new(Arc::clone(&client));
//! fanout.subscribe("zigbee2mqtt/lamp", Arc::new(|msg| {
//!     println!("{} bytes on {}", msg.payload.len(), msg.topic);
//! }));
//!
//! client.disconnect().await;
//! fanout.wait().await;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fanout;
pub mod memory;
pub mod rumqtt;

pub use client::{topic_matches, Message, MessageStream, MqttClient};
pub use config::{ClientConfig, DEFAULT_MQTT_PORT};
pub use error::{ClientError, Result};
pub use fanout::{StateHandler, SubscribeOutcome, TopicFanout};
pub use memory::MemoryClient;
pub use rumqtt::RumqttClient;
