//! Flash partition write capability
//!
//! The device exposes begin/write/end/activate semantics over its inactive
//! firmware partition. A write session opened with [`FlashWriter::begin`]
//! must always be closed, either by [`FlashWriter::end`] on success or by
//! [`FlashWriter::abort`] on any failure, so the target partition stays in
//! a consistent, reusable state.

use async_trait::async_trait;
use thiserror::Error;

/// Flash partition failures
#[derive(Error, Debug)]
pub enum FlashError {
    /// The target partition could not be opened for writing
    #[error("flash begin failed: {0}")]
    Begin(String),

    /// A chunk write failed
    #[error("flash write failed: {0}")]
    Write(String),

    /// Image finalization failed (validation, image magic, select info)
    #[error("flash finalize failed: {0}")]
    Finalize(String),

    /// The written partition could not be marked as the boot target
    #[error("partition activation failed: {0}")]
    Activate(String),

    /// An open write session could not be discarded
    #[error("flash abort failed: {0}")]
    Abort(String),
}

/// Write access to the device's OTA target partition
#[async_trait]
pub trait FlashWriter: Send + Sync {
    /// Open the inactive partition for writing; called once per session
    ///
    /// # Errors
    ///
    /// Returns [`FlashError::Begin`] when the partition cannot be opened.
    async fn begin(&self) -> Result<(), FlashError>;

    /// Append one image chunk to the open write session
    ///
    /// # Errors
    ///
    /// Returns [`FlashError::Write`] when the chunk cannot be written.
    async fn write(&self, chunk: &[u8]) -> Result<(), FlashError>;

    /// Close the write session and validate the received image
    ///
    /// # Errors
    ///
    /// Returns [`FlashError::Finalize`] when the image is not usable.
    async fn end(&self) -> Result<(), FlashError>;

    /// Mark the written partition as the next boot target
    ///
    /// # Errors
    ///
    /// Returns [`FlashError::Activate`] when the boot record rejects it.
    async fn activate(&self) -> Result<(), FlashError>;

    /// Discard an open write session, leaving the partition reusable
    ///
    /// # Errors
    ///
    /// Returns [`FlashError::Abort`] when the session cannot be discarded.
    async fn abort(&self) -> Result<(), FlashError>;
}
