//! Configuration types for the bridge
//!
//! Values come from the environment, where several generations of variable
//! names are accepted, and can be overridden by the host's raw plugin config.

use std::time::Duration;

use serde_json::Value;
use z2m_event_manager::{ClientConfig, ClientError};

/// Prefix for names this bridge owns on the broker
pub const VENDOR_PREFIX: &str = "z2m-bridge";

/// zigbee2mqtt's default base topic
pub const DEFAULT_BASE_TOPIC: &str = "zigbee2mqtt";

const URL_VARS: &[&str] = &["ZIGBEE2MQTT_MQTT_URL", "Z2M_MQTT_BROKER_URL", "MQTT_URL"];
const DISCOVERY_TOPIC_VARS: &[&str] = &[
    "ZIGBEE2MQTT_DISCOVERY_TOPIC",
    "Z2M_DISCOVERY_TOPIC",
    "MQTT_DISCOVERY_TOPIC",
];
const BASE_TOPIC_VARS: &[&str] = &["ZIGBEE2MQTT_BASE_TOPIC", "Z2M_BASE_TOPIC"];
const USERNAME_VARS: &[&str] = &["ZIGBEE2MQTT_USERNAME", "Z2M_USERNAME"];
const PASSWORD_VARS: &[&str] = &["ZIGBEE2MQTT_PASSWORD", "Z2M_PASSWORD"];

/// `<vendor-prefix>/discovery/#`
pub fn default_discovery_topic() -> String {
    format!("{VENDOR_PREFIX}/discovery/#")
}

/// Timing of the startup discovery burst detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleConfig {
    /// Quiet period before the first discovery message
    /// Default: 300 ms
    pub initial_quiet: Duration,

    /// Quiet period once messages are flowing
    /// Default: 100 ms
    pub burst_quiet: Duration,

    /// Hard limit on the wait
    /// Default: 5 seconds
    pub ceiling: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            initial_quiet: Duration::from_millis(300),
            burst_quiet: Duration::from_millis(100),
            ceiling: Duration::from_secs(5),
        }
    }
}

/// Configuration for a [`Bridge`](crate::Bridge)
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Broker URL; discovery is disabled when unset
    pub mqtt_url: Option<String>,

    /// Wildcard subscription for discovery messages
    /// Default: "z2m-bridge/discovery/#"
    pub discovery_topic: String,

    /// zigbee2mqtt base topic
    /// Default: "zigbee2mqtt"
    pub base_topic: String,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Prefix of the MQTT client id
    /// Default: "z2m-bridge"
    pub client_id_prefix: String,

    pub settle: SettleConfig,

    /// Delay before the optimistic state echo after a command
    /// Default: 20 ms
    pub optimistic_echo_delay: Duration,

    /// Buffer size of each broker subscription
    /// Default: 1000
    pub message_channel_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt_url: None,
            discovery_topic: default_discovery_topic(),
            base_topic: DEFAULT_BASE_TOPIC.to_string(),
            username: None,
            password: None,
            client_id_prefix: VENDOR_PREFIX.to_string(),
            settle: SettleConfig::default(),
            optimistic_echo_delay: Duration::from_millis(20),
            message_channel_capacity: 1000,
        }
    }
}

impl BridgeConfig {
    /// Load from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to read variables
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            mqtt_url: first_non_blank(&lookup, URL_VARS).map(|v| v.trim().to_string()),
            discovery_topic: first_non_blank(&lookup, DISCOVERY_TOPIC_VARS)
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.discovery_topic),
            base_topic: first_non_blank(&lookup, BASE_TOPIC_VARS)
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.base_topic),
            username: first_non_blank(&lookup, USERNAME_VARS),
            password: first_non_blank(&lookup, PASSWORD_VARS),
            ..defaults
        }
    }

    /// Environment configuration with the host's raw config applied on top
    pub fn from_env_with_raw(raw: Option<&Value>) -> Self {
        let mut config = Self::from_env();
        if let Some(raw) = raw {
            config.apply_raw_overrides(raw);
        }
        config
    }

    /// Apply `mqtt_url`/`discovery_topic`/`base_topic` from a host raw config
    /// object
    pub fn apply_raw_overrides(&mut self, raw: &Value) {
        if let Some(url) = raw_string(raw, "mqtt_url") {
            tracing::debug!("Broker URL overridden by host config");
            self.mqtt_url = Some(url);
        }
        if let Some(topic) = raw_string(raw, "discovery_topic") {
            tracing::debug!("Discovery topic overridden by host config: {}", topic);
            self.discovery_topic = topic;
        }
        if let Some(topic) = raw_string(raw, "base_topic") {
            self.base_topic = topic;
        }
    }

    /// zigbee2mqtt's availability topic, `<base_topic>/bridge/state`
    pub fn bridge_state_topic(&self) -> String {
        format!("{}/bridge/state", self.base_topic.trim_end_matches('/'))
    }

    /// Broker connection settings for `url`
    pub fn client_config(&self, url: &str) -> Result<ClientConfig, ClientError> {
        Ok(ClientConfig::from_url(url)?
            .with_credentials(self.username.clone(), self.password.clone())
            .with_client_id_prefix(self.client_id_prefix.clone())
            .with_channel_capacity(self.message_channel_capacity))
    }
}

fn first_non_blank(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| lookup(*name))
        .find(|value| !value.trim().is_empty())
}

fn raw_string(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
