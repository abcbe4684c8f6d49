//! HMAC authentication primitives for the Providore protocol
//!
//! This crate provides the request/response authentication layer used by a
//! device talking to a Providore server:
//!
//! - Canonical request signing (`method\npath\nversion\ncreated_at\nexpiry`)
//! - Response verification over `body\ncreated_at\nexpiry`
//! - HMAC-SHA256 digests, base64-encoded for header transport
//! - Fixed-width RFC3339 validity windows
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`key_source`]: the [`KeySource`] capability over software and
//!   hardware-protected secrets
//! - [`signer`]: canonical string construction and [`AuthToken`] production
//! - [`verifier`]: response authenticity checks
//! - [`timestamp`]: protocol validity windows
//! - [`error`]: error types
//!
//! # Security Considerations
//!
//! - All digest comparisons use constant-time operations via the `subtle`
//!   crate
//! - The software key type never prints its secret in `Debug` output
//! - Hardware-protected secrets never cross the [`KeySource`] boundary; the
//!   engine computes the digest in place
//!
//! # Example
//!
//! ```
//! use providore_hmac::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key: Arc<dyn KeySource> = Arc::new(SoftwareKey::new(b"s3cret".to_vec()));
//! let window = TimeWindow::anchored(
//!     "2024-01-01T00:00:00Z".parse()?,
//!     chrono::Duration::minutes(15),
//! );
//! let material = SigningMaterial::new("GET", "/config", "1.0.0", &window);
//! let token = RequestSigner::new(key).sign("dev-1", &material)?;
//! assert!(token.header_value().starts_with("Hmac key-id=dev-1, signature="));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod key_source;
pub mod prelude;
pub mod signer;
pub mod timestamp;
pub mod verifier;

pub use error::AuthError;
pub use key_source::{
    DIGEST_BASE64_LEN, DIGEST_LEN, HardwareHmacEngine, HardwareKey, HmacDigest, KeySlot, KeySource,
    SoftwareKey,
};
pub use signer::{AuthToken, RequestSigner, SigningMaterial};
pub use timestamp::{TIMESTAMP_LEN, TimeWindow};
pub use verifier::ResponseVerifier;
