//! Error types for guard-core

use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Message shown to end users when the database is unreachable
pub const TECHNICAL_DIFFICULTIES: &str =
    "We are experiencing technical difficulties. Please try again later.";

/// Guard error types
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Secure random number generator unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Malformed encrypted blob: {0}")]
    MalformedBlob(String),

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw driver detail is logged where the failure happens and never carried here
    #[error("{}", TECHNICAL_DIFFICULTIES)]
    ConnectionFailed,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl GuardError {
    /// Text that is safe to render to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::UploadRejected(reason) => reason.clone(),
            Self::ConnectionFailed | Self::Database(_) => TECHNICAL_DIFFICULTIES.to_string(),
            _ => "The request could not be completed.".to_string(),
        }
    }
}
