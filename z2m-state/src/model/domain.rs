//! Entity domains and the capabilities each one exposes

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Light,
    Switch,
    BinarySensor,
    #[default]
    Sensor,
    Cover,
}

impl Domain {
    /// Map a discovery type hint; anything unrecognized is a sensor
    pub fn from_hint(hint: &str) -> Self {
        match hint {
            "light" => Domain::Light,
            "switch" => Domain::Switch,
            "binary_sensor" => Domain::BinarySensor,
            "cover" => Domain::Cover,
            _ => Domain::Sensor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Light => "light",
            Domain::Switch => "switch",
            Domain::BinarySensor => "binary_sensor",
            Domain::Sensor => "sensor",
            Domain::Cover => "cover",
        }
    }

    pub fn capabilities(self) -> &'static [&'static str] {
        match self {
            Domain::Light => &["power", "brightness", "color_temp", "rgb"],
            Domain::Switch => &["power"],
            Domain::Cover => &["position"],
            Domain::BinarySensor => &["state"],
            Domain::Sensor => &["value"],
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
