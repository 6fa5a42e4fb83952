//! Discovery topic grammar
//!
//! Discovery topics look like `homeassistant/<type>/<node_id>/<object_id>/config`
//! or the shorter `homeassistant/<type>/<object_id>/config`. Only the root, the
//! entity type hint and the trailing `config` literal carry meaning here.

use crate::error::{DiscoveryError, Result};

/// Minimum number of `/`-separated segments in a discovery topic
pub const MIN_SEGMENTS: usize = 4;

/// Trailing segment every discovery topic ends with
pub const CONFIG_SEGMENT: &str = "config";

/// A topic that passed the discovery grammar check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTopic<'a> {
    /// First segment, e.g. `homeassistant`
    pub root: &'a str,
    /// Second segment, e.g. `light`, `sensor`, `cover`
    pub entity_type: &'a str,
    /// Segments between the type and `config`
    pub object_path: Vec<&'a str>,
}

impl<'a> DiscoveryTopic<'a> {
    /// Split and validate a topic string
    pub fn parse(topic: &'a str) -> Result<Self> {
        let parts: Vec<&str> = topic.split('/').collect();

        if parts.len() < MIN_SEGMENTS || parts[parts.len() - 1] != CONFIG_SEGMENT {
            return Err(DiscoveryError::InvalidTopic(topic.to_string()));
        }

        Ok(Self {
            root: parts[0],
            entity_type: parts[1],
            object_path: parts[2..parts.len() - 1].to_vec(),
        })
    }
}
