//! Error types for the Providore client engine

use thiserror::Error;

use crate::flash::FlashError;
use crate::transport::TransportError;
use providore_hmac::AuthError;

/// Errors surfaced to callers of the Providore client
///
/// No call in this crate retries on its own; retry policy, if any, belongs
/// to the caller.
#[derive(Error, Debug)]
pub enum ProvidoreError {
    /// Server response failed signature verification; the payload was
    /// discarded in full
    #[error("response signature mismatch")]
    SignatureMismatch,

    /// The request could not be signed
    #[error("request signing failed: {0}")]
    Signing(#[from] AuthError),

    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The firmware upgrade session ended without a usable image
    #[error("firmware upgrade failed")]
    FirmwareUpgradeFailed,

    /// A firmware upgrade session is already in flight
    #[error("firmware upgrade already in progress for device: {0}")]
    UpdateInProgress(String),

    /// Device credentials missing or unreadable
    #[error("credential store error: {0}")]
    Credentials(String),

    /// Flash partition operation failed
    #[error("flash error: {0}")]
    Flash(#[from] FlashError),
}
