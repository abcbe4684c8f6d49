//! Authenticated configuration fetch and firmware update engine
//!
//! This crate is the device-side engine of the Providore protocol. It lets
//! a network-connected device:
//!
//! - fetch a signed configuration blob and verify the response came from a
//!   holder of the shared secret, and
//! - download and install a firmware image over a streaming transport under
//!   the same authentication guarantee, driving the device's dual-partition
//!   update mechanism through a fail-safe state machine with rollback
//!   support.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`client`]: [`ProvidoreClient`] configuration and capability wiring
//! - [`config`]: the authenticated configuration exchange
//! - [`ota`]: the firmware update session state machine
//! - [`transport`]: streaming transport capability and event model
//! - [`flash`]: flash partition write capability
//! - [`credentials`]: device identity and shared-secret storage capability
//! - [`response`]: bounded response accumulation
//! - [`self_test`]: post-upgrade self-test and rollback control
//! - [`error`]: error types
//!
//! # Concurrency
//!
//! A config fetch completes within the caller's own await. A firmware
//! upgrade runs its state machine on a background task that exclusively
//! owns the session; the caller holds only a one-shot completion channel,
//! and a single-flight guard rejects a second concurrent upgrade (the
//! device has one OTA target partition).
//!
//! # Example
//!
//! ```ignore
//! use providore_ota::prelude::*;
//!
//! # async fn example(client: ProvidoreClient) -> Result<(), ProvidoreError> {
//! let payload = client.fetch_config().await?;
//! println!("{} config bytes", payload.bytes.len());
//!
//! client.initiate_firmware_upgrade().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod flash;
pub mod ota;
pub mod prelude;
pub mod response;
pub mod transport;

pub use client::{ClientConfig, PATH_CONFIG, PATH_FIRMWARE, ProvidoreClient};
pub use credentials::{CredentialStore, check_provisioning};
pub use error::ProvidoreError;
pub use flash::{FlashError, FlashWriter};
pub use ota::{OtaOutcome, OtaSession, OtaState, UpdateGuard};
pub use response::{BoundedBuffer, ConfigPayload, ResponseCapture};
pub use self_test::{BootControl, ImageState, SelfTestController};
pub use transport::{HttpRequest, Transport, TransportError, TransportEvent, headers};
