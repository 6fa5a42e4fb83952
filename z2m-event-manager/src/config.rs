//! Configuration types for the broker connection
//!
//! A [`ClientConfig`] is usually built from the broker URL handed to the
//! bridge (`tcp://host:1883`), then refined with credentials and a client id
//! prefix before being passed to [`RumqttClient`](crate::RumqttClient).

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, Result};

/// Port used when the broker URL does not name one
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Configuration for a broker connection
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker hostname or IP address
    pub host: String,

    /// Broker port
    /// Default: 1883
    pub port: u16,

    /// Prefix for the generated MQTT client id; a random suffix is appended
    /// Default: "z2m-bridge"
    pub client_id_prefix: String,

    /// Optional username for broker authentication
    pub username: Option<String>,

    /// Optional password, only sent together with a username
    pub password: Option<String>,

    /// MQTT keep-alive interval
    /// Default: 30 seconds
    pub keep_alive: Duration,

    /// How long to wait for the broker's CONNACK
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Buffer size of each subscription's message channel
    /// Default: 1000
    pub channel_capacity: usize,

    /// Buffer size of the outgoing request queue
    /// Default: 100
    pub request_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_MQTT_PORT,
            client_id_prefix: "z2m-bridge".to_string(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 1000,
            request_capacity: 100,
        }
    }
}

impl ClientConfig {
    /// Build a config from a broker URL such as `tcp://10.0.0.5:1883`
    ///
    /// Accepts the `tcp` and `mqtt` schemes; a bare `host:port` is treated as
    /// `tcp`. User info in the URL becomes the broker credentials.
    pub fn from_url(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ClientError::InvalidUrl("empty broker URL".to_string()));
        }

        let url = if raw.contains("://") {
            Url::parse(raw)
        } else {
            Url::parse(&format!("tcp://{raw}"))
        }
        .map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            other => {
                return Err(ClientError::InvalidUrl(format!(
                    "{raw}: unsupported scheme '{other}'"
                )))
            }
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ClientError::InvalidUrl(format!("{raw}: missing host")))?
            .to_string();

        let mut config = Self {
            host,
            port: url.port().unwrap_or(DEFAULT_MQTT_PORT),
            ..Self::default()
        };

        if !url.username().is_empty() {
            config.username = Some(url.username().to_string());
            config.password = url.password().map(str::to_string);
        }

        Ok(config)
    }

    /// Set broker credentials, ignoring an empty username
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            self.username = Some(username);
            self.password = password;
        }
        self
    }

    pub fn with_client_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.client_id_prefix = prefix.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// A fresh client id: `<prefix>-<random suffix>`
    pub fn client_id(&self) -> String {
        format!("{}-{}", self.client_id_prefix, uuid::Uuid::new_v4().simple())
    }
}
