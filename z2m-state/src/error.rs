//! Error types for z2m-state

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to serialize discovered entities: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StateError>;
