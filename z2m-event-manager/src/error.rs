//! Error types for broker client operations

/// Errors raised by an [`MqttClient`](crate::MqttClient) implementation
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The broker could not be reached or refused the session
    #[error("Failed to connect to MQTT broker: {0}")]
    ConnectFailed(String),

    /// A subscribe request was rejected or could not be sent
    #[error("Failed to subscribe to {topic}: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    /// A publish request could not be sent
    #[error("Failed to publish to {topic}: {reason}")]
    PublishFailed { topic: String, reason: String },

    /// The operation needs a connected client
    #[error("MQTT client is not connected")]
    NotConnected,

    /// The broker URL could not be turned into connection options
    #[error("Invalid MQTT broker URL: {0}")]
    InvalidUrl(String),
}

/// Convenience type alias for Results using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;
