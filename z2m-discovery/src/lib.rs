//! Home-Assistant-style MQTT discovery parsing
//!
//! Bridges such as zigbee2mqtt announce each entity with a retained message on
//! `<root>/<type>/.../config`. This crate turns one such message into a
//! [`DiscoveryRecord`], or rejects it.
//!
//! # Quick Start
//!
//! ```
//! use z2m_discovery::parse;
//!
//! let record = parse(
//!     "homeassistant/light/0x0017880104e45517/light/config",
//!     br#"{"unique_id": "0x0017880104e45517_light", "name": "Kitchen",
//!          "device": {"identifiers": ["zigbee2mqtt_0x0017880104e45517"]},
//!          "state_topic": "zigbee2mqtt/kitchen",
//!          "value_template": "{{ value_json['state'] }}"}"#,
//! )
//! .unwrap();
//!
//! assert_eq!(record.entity_type_hint, "light");
//! assert_eq!(record.device_identifier, "zigbee2mqtt_0x0017880104e45517");
//! assert_eq!(record.value_template_path, "state");
//! ```

mod error;
pub mod payload;
pub mod scalar;
pub mod template;
pub mod topic;

pub use error::{DiscoveryError, Result};
pub use payload::{DeviceInfo, DiscoveryPayload, DiscoveryRecord};
pub use scalar::PayloadScalar;
pub use template::value_template_path;
pub use topic::DiscoveryTopic;

use serde_json::Value;

/// Parse a discovery topic and payload into a [`DiscoveryRecord`]
///
/// Fails with [`DiscoveryError::InvalidTopic`] for topics outside the
/// discovery grammar, [`DiscoveryError::DecodeError`] for anything that is not
/// a JSON object of the expected shape, and [`DiscoveryError::MissingIdentity`]
/// when `unique_id` is absent or empty.
pub fn parse(topic: &str, payload: &[u8]) -> Result<DiscoveryRecord> {
    let discovery_topic = DiscoveryTopic::parse(topic)?;

    let value: Value = serde_json::from_slice(payload)?;
    if !value.is_object() {
        return Err(DiscoveryError::DecodeError(serde::de::Error::custom(
            "discovery payload must be a JSON object",
        )));
    }
    let decoded: DiscoveryPayload = serde_json::from_value(value)?;

    let unique_id = match decoded.unique_id.clone() {
        Some(id) if !id.is_empty() => id,
        _ => return Err(DiscoveryError::MissingIdentity),
    };

    let record = DiscoveryRecord::from_payload(unique_id, decoded, discovery_topic.entity_type);

    tracing::debug!(
        "Parsed discovery on {}: unique_id={} type={} device={:?}",
        topic,
        record.unique_id,
        record.entity_type_hint,
        record.device_identifier
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discovery() {
        let topic = "homeassistant/light/node/object/config";
        let payload = br#"{"name":"Kitchen","unique_id":"abc123","device":{"name":"Kitchen Lamp"},"state_topic":"zigbee2mqtt/kitchen","command_topic":"zigbee2mqtt/kitchen/set","payload_on":"ON","payload_off":"OFF","value_template":"{{ value_json['state'] }}"}"#;

        let record = parse(topic, payload).unwrap();
        assert_eq!(record.entity_type_hint, "light");
        assert_eq!(record.unique_id, "abc123");
        assert_eq!(record.device_name, "Kitchen Lamp");
        assert_eq!(record.payload_on, "ON");
        assert_eq!(record.payload_off, "OFF");
        assert_eq!(record.value_template_path, "state");
    }

    #[test]
    fn test_parse_rejects_invalid_topic() {
        let err = parse("zigbee2mqtt/bridge/devices", b"{}").unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidTopic(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse("homeassistant/light/a/b/config", b"{\"unique_id\": ").unwrap_err();
        assert!(matches!(err, DiscoveryError::DecodeError(_)));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = parse("homeassistant/light/a/b/config", b"[1, 2]").unwrap_err();
        assert!(matches!(err, DiscoveryError::DecodeError(_)));
    }

    #[test]
    fn test_parse_rejects_missing_identity() {
        let err = parse("homeassistant/light/a/b/config", br#"{"name": "x"}"#).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingIdentity));

        let err = parse("homeassistant/light/a/b/config", br#"{"unique_id": ""}"#).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingIdentity));
    }

    #[test]
    fn test_parse_normalizes_scalar_payloads() {
        let record = parse(
            "homeassistant/binary_sensor/a/b/config",
            br#"{"unique_id": "u", "payload_on": true, "payload_off": 0}"#,
        )
        .unwrap();
        assert_eq!(record.payload_on, "true");
        assert_eq!(record.payload_off, "0");
    }
}
