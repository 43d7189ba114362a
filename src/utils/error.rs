use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, P2PError>;

/// Rejection reasons for a malformed registration request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("files cannot be nil")]
    FilesNil,

    #[error("files cannot be empty")]
    FilesEmpty,

    #[error("invalid format")]
    InvalidFormat,

    #[error("files must be absolute paths")]
    NotAbsolute,

    #[error("owner cannot be empty")]
    EmptyOwner,
}

#[derive(Error, Debug)]
pub enum P2PError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("File not found: {path} (owner {owner})")]
    NotFound { owner: String, path: String },

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("No port available at or above {0}")]
    NoPortAvailable(u16),

    #[error("Unknown peer: {0}")]
    UnknownPeer(String),

    #[error("Registry is no longer running")]
    RegistryClosed,

    #[error("Tracker error: {0}")]
    Tracker(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for P2PError {
    fn from(err: std::io::Error) -> Self {
        P2PError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for P2PError {
    fn from(err: serde_json::Error) -> Self {
        P2PError::SerializationError(err.to_string())
    }
}
