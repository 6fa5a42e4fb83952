//! Property-based tests for the payload codec

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use z2m_codec::{decode_payload, decode_state, encode_command, PowerState};

proptest! {
    #[test]
    fn prop_payload_on_always_decodes_on(payload_on in "[A-Za-z0-9_]{1,12}") {
        let padded = format!("  {}\n", payload_on);
        prop_assert_eq!(decode_state(padded.as_bytes(), &Map::new(), &payload_on), PowerState::On);
    }

    #[test]
    fn prop_decode_never_panics(raw in prop::collection::vec(any::<u8>(), 0..64)) {
        let decoded = decode_payload(&raw, "ON", "a.b");
        prop_assert_eq!(decoded.properties["power"].clone(), Value::Bool(decoded.power.is_on()));
    }

    #[test]
    fn prop_temperature_mired_matches_rounding(kelvin in 1i64..20_000) {
        let mut params = Map::new();
        params.insert("kelvin".to_string(), json!(kelvin));

        let encoded = encode_command("SetTemperature", &params, "", "");
        let expected = (1_000_000.0 / kelvin as f64).round() as i64;
        prop_assert_eq!(encoded.delta["color_temp"].clone(), json!(expected));
    }

    #[test]
    fn prop_brightness_echoes_level(level in 0i64..=254) {
        let mut params = Map::new();
        params.insert("level".to_string(), json!(level.to_string()));

        let encoded = encode_command("SetBrightness", &params, "", "");
        let payload: Value = serde_json::from_str(encoded.payload.as_deref().unwrap()).unwrap();
        prop_assert_eq!(payload["brightness"].clone(), json!(level));
    }
}
