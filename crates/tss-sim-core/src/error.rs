//! Error types for simulated threshold operations

use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can surface to the caller of an operation
#[derive(Debug, Error)]
pub enum Error {
    // ============ Configuration Errors ============
    /// Invalid operation parameters (party count, threshold, identities)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ============ Storage Errors ============
    /// Fewer persisted key shares than the operation needs
    #[error("Not enough key shares: expected at least {required}, found {available}")]
    NotEnoughShares { required: usize, available: usize },

    /// No signature files were found
    #[error("No signature found")]
    NoSignatures,

    /// Wrong number of signature files after signing
    #[error("Expected {expected} signature files, found {found}")]
    SignatureCountMismatch { expected: usize, found: usize },

    /// Signature files disagree in content
    #[error("Signature file content mismatch: {0}")]
    SignatureMismatch(String),

    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ============ Cryptographic Errors ============
    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    // ============ Runtime Errors ============
    /// A participant reached the failed state
    #[error("Participant {party} failed: {reason}")]
    ParticipantFailed { party: String, reason: String },

    /// The operation did not finish before its deadline
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Deserialization(e.to_string())
    }
}
