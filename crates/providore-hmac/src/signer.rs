//! Canonical request signing
//!
//! A request is authenticated by an HMAC over a canonical string of five
//! fields joined by newline, in fixed order: method, path, protocol
//! version, created-at, expiry. No field contains the delimiter in valid
//! operation; all five are produced internally, never taken from user
//! input. The digest travels base64-encoded inside the `Authorization`
//! header.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::key_source::KeySource;
use crate::timestamp::TimeWindow;

/// Immutable inputs to one canonical signing string
///
/// Built once per request and consumed to produce exactly one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningMaterial {
    /// HTTP method, uppercase
    pub method: String,
    /// Request path, leading slash included
    pub path: String,
    /// Firmware version the device reports
    pub protocol_version: String,
    /// Window opening timestamp, protocol format
    pub created_at: String,
    /// Window closing timestamp, protocol format
    pub expiry: String,
}

impl SigningMaterial {
    /// Build material for a request inside `window`
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        protocol_version: impl Into<String>,
        window: &TimeWindow,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            protocol_version: protocol_version.into(),
            created_at: window.created_at(),
            expiry: window.expiry(),
        }
    }

    /// The five fields joined by newline, no trailing newline
    pub fn canonical_string(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}",
            self.method, self.path, self.protocol_version, self.created_at, self.expiry
        )
    }
}

/// Authorization token carried in the `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// Device identifier the server resolves the shared secret by
    pub device_id: String,
    /// Base64-encoded HMAC digest of the canonical string
    pub signature: String,
}

impl AuthToken {
    /// Render the single header value: `Hmac key-id=<id>, signature=<sig>`
    pub fn header_value(&self) -> String {
        format!(
            "Hmac key-id={}, signature={}",
            self.device_id, self.signature
        )
    }
}

/// Signs canonical request material with a device key
pub struct RequestSigner {
    key: Arc<dyn KeySource>,
}

impl RequestSigner {
    /// Create a signer over the provisioned key source
    pub fn new(key: Arc<dyn KeySource>) -> Self {
        Self { key }
    }

    /// Produce the authorization token for one request
    ///
    /// Signing is pure: the same material and key always yield the same
    /// token. Failure means the key source is unusable, not a transient
    /// condition; callers must not retry.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthError`] from the key source.
    pub fn sign(&self, device_id: &str, material: &SigningMaterial) -> Result<AuthToken, AuthError> {
        let digest = self.key.sign(material.canonical_string().as_bytes())?;
        Ok(AuthToken {
            device_id: device_id.to_string(),
            signature: digest.to_base64(),
        })
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}
