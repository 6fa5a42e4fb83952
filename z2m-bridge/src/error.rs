//! Error types for bridge operations

use thiserror::Error;
use z2m_event_manager::ClientError;
use z2m_state::StateError;

/// Errors surfaced to the host
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The entity is unknown or was discovered without a command topic
    #[error("No command topic for entity {0}")]
    NoCommandTopic(String),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("Broker connect failed: {0}")]
    BrokerConnectFailed(#[source] ClientError),

    #[error("Broker subscribe failed: {0}")]
    BrokerSubscribeFailed(#[source] ClientError),

    #[error("Broker publish failed: {0}")]
    BrokerPublishFailed(#[source] ClientError),

    #[error("Bridge is not connected to a broker")]
    NotConnected,

    #[error("Bridge is already started")]
    AlreadyStarted,

    #[error("State error: {0}")]
    State(#[from] StateError),

    /// A host callback reported a failure
    #[error("Host callback failed: {0}")]
    Host(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
