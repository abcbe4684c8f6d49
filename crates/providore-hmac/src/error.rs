//! Error types for signing and verification

use thiserror::Error;

/// Errors that can occur while producing or checking a keyed digest
#[derive(Error, Debug)]
pub enum AuthError {
    /// The key source cannot produce a digest (secret not provisioned)
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    /// The hardware key engine rejected or failed the operation
    #[error("hardware key engine error: {0}")]
    Hardware(String),

    /// A base64 value could not be decoded
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A decoded digest had the wrong length
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength {
        /// Required digest length in bytes
        expected: usize,
        /// Length actually decoded
        actual: usize,
    },
}
