//! Inbound state payload decoding
//!
//! State topics carry either a bare token (`ON`, `1`, `true`, a configured
//! `payload_on`) or a JSON object such as `{"state":"ON","brightness":128}`.
//! Power is resolved in a fixed order:
//!
//! 1. the trimmed raw text equals the entity's `payload_on`
//! 2. the trimmed raw text is an on/off keyword (case-insensitive)
//! 3. the parsed object's `state`, `power`, `value` keys, in that order
//!
//! Anything unresolved decodes to off.

use serde_json::{Map, Value};

use crate::path::extract_path;

/// Keys scanned in a parsed state object, highest priority first
pub const POWER_KEYS: [&str; 3] = ["state", "power", "value"];

/// Decoded power of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    On,
    #[default]
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        matches!(self, PowerState::On)
    }

    /// Lowercase label, `on` or `off`
    pub fn label(self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Off => "off",
        }
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

/// A decoded state message, ready to hand to the host as properties
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedState {
    pub power: PowerState,
    /// Parsed object fields plus `power` (bool), `state` (label) and, when
    /// resolvable, `value`
    pub properties: Map<String, Value>,
}

/// Resolve power from a raw payload and its parsed object form
pub fn decode_state(raw: &[u8], parsed: &Map<String, Value>, payload_on: &str) -> PowerState {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();

    if !text.is_empty() {
        if let Some(power) = match_text(text, payload_on) {
            return power;
        }
    }

    for key in POWER_KEYS {
        let resolved = match parsed.get(key) {
            Some(Value::Bool(b)) => Some(PowerState::from(*b)),
            Some(Value::String(s)) => match_text(s.trim(), payload_on),
            Some(Value::Number(n)) => n.as_f64().map(|f| PowerState::from(f != 0.0)),
            _ => None,
        };
        if let Some(power) = resolved {
            return power;
        }
    }

    PowerState::Off
}

/// Decode a raw state payload into power plus a property map
///
/// `value_path` is the dotted path extracted from the entity's value
/// template; when it resolves inside the payload object its value is exposed
/// as the `value` property. Non-object payloads expose the payload itself as
/// `value`.
pub fn decode_payload(raw: &[u8], payload_on: &str, value_path: &str) -> DecodedState {
    let parsed = serde_json::from_slice::<Value>(raw).ok();

    let mut properties = match &parsed {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    let power = decode_state(raw, &properties, payload_on);

    match &parsed {
        Some(object @ Value::Object(_)) => {
            if let Some(value) = extract_path(object, value_path) {
                properties.insert("value".to_string(), value.clone());
            }
        }
        Some(scalar) => {
            properties.insert("value".to_string(), scalar.clone());
        }
        None => {
            let text = String::from_utf8_lossy(raw).trim().to_string();
            if !text.is_empty() {
                properties.insert("value".to_string(), Value::String(text));
            }
        }
    }

    properties.insert("power".to_string(), Value::Bool(power.is_on()));
    properties.insert("state".to_string(), Value::String(power.label().to_string()));

    DecodedState { power, properties }
}

fn match_text(text: &str, payload_on: &str) -> Option<PowerState> {
    if !payload_on.is_empty() && text == payload_on {
        return Some(PowerState::On);
    }
    match text.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Some(PowerState::On),
        "off" | "false" | "0" => Some(PowerState::Off),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[rstest]
    #[case("ON", "", PowerState::On)]
    #[case("  on ", "", PowerState::On)]
    #[case("True", "", PowerState::On)]
    #[case("1", "", PowerState::On)]
    #[case("OFF", "", PowerState::Off)]
    #[case("false", "", PowerState::Off)]
    #[case("0", "", PowerState::Off)]
    #[case("open", "open", PowerState::On)]
    #[case("closed", "open", PowerState::Off)]
    fn test_raw_text(#[case] raw: &str, #[case] payload_on: &str, #[case] expected: PowerState) {
        assert_eq!(decode_state(raw.as_bytes(), &Map::new(), payload_on), expected);
    }

    #[test]
    fn test_payload_on_wins_over_keywords() {
        // A device whose on-payload is literally "0" (inverted contact sensors)
        assert_eq!(decode_state(b"0", &Map::new(), "0"), PowerState::On);
    }

    #[test]
    fn test_raw_beats_parsed_object() {
        let parsed = object(json!({"state": "OFF"}));
        assert_eq!(decode_state(b"ON", &parsed, ""), PowerState::On);
    }

    #[test]
    fn test_empty_raw_falls_through_to_object() {
        let parsed = object(json!({"state": "OFF"}));
        assert_eq!(decode_state(b"", &parsed, ""), PowerState::Off);

        let parsed = object(json!({"state": "ON"}));
        assert_eq!(decode_state(b"", &parsed, ""), PowerState::On);
    }

    #[test]
    fn test_empty_everything_defaults_off() {
        assert_eq!(decode_state(b"", &Map::new(), ""), PowerState::Off);
        assert_eq!(decode_state(b"   ", &Map::new(), "ON"), PowerState::Off);
    }

    #[rstest]
    #[case(json!({"state": true}), PowerState::On)]
    #[case(json!({"state": false}), PowerState::Off)]
    #[case(json!({"power": 1}), PowerState::On)]
    #[case(json!({"power": 0}), PowerState::Off)]
    #[case(json!({"value": 0.5}), PowerState::On)]
    #[case(json!({"value": "on"}), PowerState::On)]
    fn test_object_key_types(#[case] parsed: Value, #[case] expected: PowerState) {
        assert_eq!(decode_state(b"", &object(parsed), ""), expected);
    }

    #[test]
    fn test_object_key_priority() {
        // state outranks power, power outranks value
        let parsed = object(json!({"state": "OFF", "power": true, "value": 1}));
        assert_eq!(decode_state(b"", &parsed, ""), PowerState::Off);

        let parsed = object(json!({"power": false, "value": 1}));
        assert_eq!(decode_state(b"", &parsed, ""), PowerState::Off);
    }

    #[test]
    fn test_unresolved_key_falls_through() {
        // "unknown" does not resolve, so power decides
        let parsed = object(json!({"state": "unknown", "power": "ON"}));
        assert_eq!(decode_state(b"", &parsed, ""), PowerState::On);

        let parsed = object(json!({"state": null, "value": 3}));
        assert_eq!(decode_state(b"", &parsed, ""), PowerState::On);
    }

    #[test]
    fn test_object_string_matches_payload_on() {
        let parsed = object(json!({"state": "LOCKED"}));
        assert_eq!(decode_state(b"", &parsed, "LOCKED"), PowerState::On);
    }

    #[test]
    fn test_decode_payload_json_object() {
        let raw = br#"{"state":"ON","brightness":128,"color":{"x":0.3}}"#;
        let decoded = decode_payload(raw, "ON", "color.x");

        assert_eq!(decoded.power, PowerState::On);
        assert_eq!(decoded.properties["brightness"], json!(128));
        assert_eq!(decoded.properties["power"], json!(true));
        assert_eq!(decoded.properties["state"], json!("on"));
        assert_eq!(decoded.properties["value"], json!(0.3));
    }

    #[test]
    fn test_decode_payload_bare_token() {
        let decoded = decode_payload(b"OFF", "ON", "");
        assert_eq!(decoded.power, PowerState::Off);
        assert_eq!(decoded.properties["value"], json!("OFF"));
        assert_eq!(decoded.properties["state"], json!("off"));
    }

    #[test]
    fn test_decode_payload_numeric_sensor() {
        let decoded = decode_payload(b"21.5", "", "");
        assert_eq!(decoded.properties["value"], json!(21.5));
        assert_eq!(decoded.power, PowerState::Off);
    }

    #[test]
    fn test_decode_payload_unresolved_path() {
        let decoded = decode_payload(br#"{"temperature": 20}"#, "", "humidity");
        assert!(!decoded.properties.contains_key("value"));
    }
}
