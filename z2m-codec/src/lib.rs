//! Payload translation between MQTT wire formats and host properties
//!
//! Stateless helpers used on both directions of the bridge:
//!
//! ```text
//! state topic  ── raw bytes ──► decode_payload ──► power + properties ──► host
//! host command ── name/params ─► encode_command ─► wire payload + delta ─► command topic
//! ```
//!
//! # Example
//!
//! ```
//! use serde_json::Map;
//! use z2m_codec::{decode_payload, encode_command, PowerState};
//!
//! let decoded = decode_payload(br#"{"state":"ON","brightness":200}"#, "ON", "");
//! assert_eq!(decoded.power, PowerState::On);
//!
//! let encoded = encode_command("TurnOff", &Map::new(), "ON", "OFF");
//! assert_eq!(encoded.payload.as_deref(), Some("OFF"));
//! ```

pub mod command;
pub mod number;
pub mod path;
pub mod state;

pub use command::{encode, encode_command, CommandKind, EncodedCommand};
pub use number::{int_param, kelvin_to_mired};
pub use path::extract_path;
pub use state::{decode_payload, decode_state, DecodedState, PowerState};
