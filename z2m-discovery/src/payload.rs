//! Discovery payload wire format and the typed record derived from it

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::scalar::{render_value, PayloadScalar};
use crate::template::value_template_path;

/// Discovery payload as published on the broker
///
/// Both the long field names and Home Assistant's abbreviated forms are
/// accepted. Every field is optional at this layer; identity is checked when
/// the payload is turned into a [`DiscoveryRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "uniq_id")]
    pub unique_id: Option<String>,
    #[serde(default, alias = "dev")]
    pub device: Option<DeviceInfo>,
    #[serde(default, alias = "stat_t")]
    pub state_topic: Option<String>,
    #[serde(default, alias = "cmd_t")]
    pub command_topic: Option<String>,
    #[serde(default, alias = "pl_on")]
    pub payload_on: PayloadScalar,
    #[serde(default, alias = "pl_off")]
    pub payload_off: PayloadScalar,
    #[serde(default, alias = "val_tpl")]
    pub value_template: Option<String>,
}

/// The `device` block of a discovery payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    /// Hardware identifiers; a bare string is treated as a one-element list
    #[serde(default, alias = "ids", deserialize_with = "one_or_many")]
    pub identifiers: Vec<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "mdl")]
    pub model: Option<String>,
    #[serde(default, alias = "mf")]
    pub manufacturer: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

/// A parsed, normalized discovery message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryRecord {
    /// Primary key of the entity; never empty
    pub unique_id: String,
    pub name: String,
    /// First element of `device.identifiers`, empty if none were supplied
    pub device_identifier: String,
    pub device_name: String,
    pub device_model: String,
    pub device_manufacturer: String,
    /// Second topic segment, e.g. `light`
    pub entity_type_hint: String,
    pub state_topic: String,
    pub command_topic: String,
    pub payload_on: String,
    pub payload_off: String,
    /// Dotted path read by `value_template`, empty if none
    pub value_template_path: String,
}

impl DiscoveryRecord {
    /// Build a record from a decoded payload. The caller has already
    /// checked that `unique_id` is present.
    pub(crate) fn from_payload(
        unique_id: String,
        payload: DiscoveryPayload,
        entity_type_hint: &str,
    ) -> Self {
        let device = payload.device.unwrap_or_default();

        Self {
            unique_id,
            name: payload.name.unwrap_or_default(),
            device_identifier: device
                .identifiers
                .first()
                .map(render_value)
                .unwrap_or_default(),
            device_name: device.name.unwrap_or_default(),
            device_model: device.model.unwrap_or_default(),
            device_manufacturer: device.manufacturer.unwrap_or_default(),
            entity_type_hint: entity_type_hint.to_string(),
            state_topic: payload.state_topic.unwrap_or_default(),
            command_topic: payload.command_topic.unwrap_or_default(),
            payload_on: payload.payload_on.render(),
            payload_off: payload.payload_off.render(),
            value_template_path: payload
                .value_template
                .as_deref()
                .map(value_template_path)
                .unwrap_or_default(),
        }
    }

    /// Whether discovery supplied a device identifier to group this entity by
    pub fn is_device_groupable(&self) -> bool {
        !self.device_identifier.is_empty()
    }
}
