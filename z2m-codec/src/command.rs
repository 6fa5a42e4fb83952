//! Outbound command encoding
//!
//! Host commands become a wire payload for the entity's command topic plus a
//! state delta the host can apply optimistically before the device echoes its
//! new state.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::number::{int_param, kelvin_to_mired};

/// Commands the bridge knows how to translate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    TurnOn,
    TurnOff,
    SetBrightness,
    SetTemperature,
    SetRgb,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::TurnOn,
        CommandKind::TurnOff,
        CommandKind::SetBrightness,
        CommandKind::SetTemperature,
        CommandKind::SetRgb,
    ];

    /// Look up a command by its host-facing name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::TurnOn => "TurnOn",
            CommandKind::TurnOff => "TurnOff",
            CommandKind::SetBrightness => "SetBrightness",
            CommandKind::SetTemperature => "SetTemperature",
            CommandKind::SetRgb => "SetRGB",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of encoding a command
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedCommand {
    /// Payload to publish; `None` means there is nothing to send
    pub payload: Option<String>,
    /// Properties the host should assume changed
    pub delta: Map<String, Value>,
}

impl EncodedCommand {
    fn noop() -> Self {
        Self::default()
    }

    fn new(payload: String, delta: Value) -> Self {
        let delta = match delta {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            payload: Some(payload),
            delta,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.payload.is_none()
    }
}

/// Encode a named command for the wire
///
/// Unknown command names, and `SetTemperature` without a positive `kelvin`,
/// encode to a no-op.
pub fn encode_command(
    name: &str,
    params: &Map<String, Value>,
    payload_on: &str,
    payload_off: &str,
) -> EncodedCommand {
    match CommandKind::from_name(name) {
        Some(kind) => encode(kind, params, payload_on, payload_off),
        None => EncodedCommand::noop(),
    }
}

/// Encode a known command kind
pub fn encode(
    kind: CommandKind,
    params: &Map<String, Value>,
    payload_on: &str,
    payload_off: &str,
) -> EncodedCommand {
    match kind {
        CommandKind::TurnOn => {
            let payload = if payload_on.is_empty() {
                json!({"state": "ON"}).to_string()
            } else {
                payload_on.to_string()
            };
            EncodedCommand::new(payload, json!({"state": "ON", "power": true}))
        }
        CommandKind::TurnOff => {
            let payload = if payload_off.is_empty() {
                json!({"state": "OFF"}).to_string()
            } else {
                payload_off.to_string()
            };
            EncodedCommand::new(payload, json!({"state": "OFF", "power": false}))
        }
        CommandKind::SetBrightness => {
            let level = int_param(params.get("level"));
            EncodedCommand::new(
                json!({"state": "ON", "brightness": level}).to_string(),
                json!({"state": "ON", "power": true, "brightness": level}),
            )
        }
        CommandKind::SetTemperature => {
            let kelvin = int_param(params.get("kelvin"));
            let Some(mired) = kelvin_to_mired(kelvin) else {
                return EncodedCommand::noop();
            };
            EncodedCommand::new(
                json!({
                    "state": "ON",
                    "color_temp_kelvin": kelvin,
                    "color_temp": mired,
                })
                .to_string(),
                json!({
                    "state": "ON",
                    "power": true,
                    "kelvin": kelvin,
                    "temperature": kelvin,
                    "color_temp": mired,
                }),
            )
        }
        CommandKind::SetRgb => {
            let [r, g, b] = rgb_params(params);
            EncodedCommand::new(
                json!({"state": "ON", "color": {"r": r, "g": g, "b": b}}).to_string(),
                json!({"state": "ON", "power": true, "r": r, "g": g, "b": b}),
            )
        }
    }
}

/// Channels from `r`/`g`/`b` keys, falling back to an `rgb` triple
fn rgb_params(params: &Map<String, Value>) -> [i64; 3] {
    if let Some(Value::Array(triple)) = params.get("rgb") {
        if triple.len() == 3 && !params.contains_key("r") {
            return [
                int_param(triple.first()),
                int_param(triple.get(1)),
                int_param(triple.get(2)),
            ];
        }
    }
    [
        int_param(params.get("r")),
        int_param(params.get("g")),
        int_param(params.get("b")),
    ]
}
