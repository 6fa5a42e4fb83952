//! Error types for discovery parsing.

/// Reasons a discovery message is rejected.
///
/// None of these are fatal: callers log the error and drop the message, since
/// discovery subscriptions routinely see traffic from unrelated topics.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Topic does not match `<root>/<type>/.../config`
    #[error("Invalid discovery topic: {0}")]
    InvalidTopic(String),

    /// Payload is not a JSON object of the expected shape
    #[error("Failed to decode discovery payload: {0}")]
    DecodeError(#[from] serde_json::Error),

    /// Payload has no (or an empty) `unique_id`
    #[error("Discovery payload is missing unique_id")]
    MissingIdentity,
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DiscoveryError::InvalidTopic("zigbee2mqtt/bridge/devices".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid discovery topic: zigbee2mqtt/bridge/devices"
        );

        assert_eq!(
            DiscoveryError::MissingIdentity.to_string(),
            "Discovery payload is missing unique_id"
        );
    }

    #[test]
    fn test_decode_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: DiscoveryError = serde_err.into();
        assert!(matches!(error, DiscoveryError::DecodeError(_)));
        assert!(error.to_string().starts_with("Failed to decode discovery payload"));
    }
}
