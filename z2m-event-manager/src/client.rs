//! Broker client seam
//!
//! Everything above this crate talks to the broker through [`MqttClient`], so
//! the real `rumqttc` transport and in-memory test doubles are interchangeable.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// A message delivered on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Messages for one subscription; yields `None` once the client disconnects
pub type MessageStream = mpsc::Receiver<Message>;

/// Connect/subscribe/publish primitives of a broker connection
///
/// Implementations deliver at least once with no ordering guarantee across
/// topics, and serialize concurrent publishes themselves.
#[async_trait]
pub trait MqttClient: Send + Sync {
    /// Open the broker session
    async fn connect(&self) -> Result<()>;

    /// Subscribe to a topic filter, resolving once the request is accepted
    async fn subscribe(&self, topic: &str) -> Result<MessageStream>;

    /// Publish a non-retained payload
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;

    /// Close the session and end every open [`MessageStream`]
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;
}

/// Whether an MQTT topic filter (with `+`/`#` wildcards) matches a topic name
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    // Wildcards never match system topics at the first level
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("homeassistant/#", "homeassistant/light/a/b/config", true)]
    #[case("homeassistant/#", "homeassistant", true)]
    #[case("#", "zigbee2mqtt/lamp", true)]
    #[case("zigbee2mqtt/+", "zigbee2mqtt/lamp", true)]
    #[case("zigbee2mqtt/+", "zigbee2mqtt/lamp/set", false)]
    #[case("zigbee2mqtt/+/set", "zigbee2mqtt/lamp/set", true)]
    #[case("zigbee2mqtt/lamp", "zigbee2mqtt/lamp", true)]
    #[case("zigbee2mqtt/lamp", "zigbee2mqtt/lamp2", false)]
    #[case("zigbee2mqtt/lamp/set", "zigbee2mqtt/lamp", false)]
    #[case("#", "$SYS/broker/uptime", false)]
    #[case("$SYS/#", "$SYS/broker/uptime", true)]
    fn test_topic_matches(#[case] filter: &str, #[case] topic: &str, #[case] expected: bool) {
        assert_eq!(topic_matches(filter, topic), expected);
    }
}
