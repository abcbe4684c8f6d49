//! Key material abstraction for HMAC signing
//!
//! The protocol authenticates every exchange with a per-device shared
//! secret. Depending on provisioning, that secret lives either in ordinary
//! memory (read out of the credential store) or in a protected hardware
//! region that computes digests without ever releasing the key bytes. Both
//! are driven through the [`KeySource`] capability, selected at provisioning
//! time; the signing and verification paths are oblivious to which one is
//! active.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Length of an HMAC-SHA256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of a 32-byte digest in base64, as carried in headers.
pub const DIGEST_BASE64_LEN: usize = 44;

/// Keyed digest over a canonical protocol message
#[derive(Debug, Clone, Copy)]
pub struct HmacDigest {
    bytes: [u8; DIGEST_LEN],
}

impl HmacDigest {
    /// Create a digest from raw bytes
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self { bytes }
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.bytes
    }

    /// Encode the digest as base64 (standard alphabet with padding)
    pub fn to_base64(&self) -> String {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        STANDARD.encode(self.bytes)
    }

    /// Parse a digest from base64
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not valid base64 or decodes to a
    /// length other than [`DIGEST_LEN`].
    pub fn from_base64(encoded: &str) -> Result<Self, AuthError> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        let decoded = STANDARD.decode(encoded)?;

        if decoded.len() != DIGEST_LEN {
            return Err(AuthError::InvalidDigestLength {
                expected: DIGEST_LEN,
                actual: decoded.len(),
            });
        }

        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    /// Compare two digests in constant time
    pub fn ct_eq(&self, other: &HmacDigest) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl PartialEq for HmacDigest {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other)
    }
}

impl Eq for HmacDigest {}

/// Capability that produces a keyed digest over a message
///
/// Signing is pure and deterministic; a failure here is structural (secret
/// not provisioned, engine unavailable) and is never retried.
pub trait KeySource: Send + Sync {
    /// Compute the HMAC-SHA256 digest of `message` with the device secret
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyUnavailable`] when no usable secret is
    /// provisioned, or [`AuthError::Hardware`] when a hardware engine fails.
    fn sign(&self, message: &[u8]) -> Result<HmacDigest, AuthError>;
}

/// Shared secret held in ordinary memory
#[derive(Clone)]
pub struct SoftwareKey {
    secret: Vec<u8>,
}

impl SoftwareKey {
    /// Create a key source from shared secret bytes
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl KeySource for SoftwareKey {
    fn sign(&self, message: &[u8]) -> Result<HmacDigest, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::KeyUnavailable(
                "shared secret is empty".to_string(),
            ));
        }

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| AuthError::KeyUnavailable(e.to_string()))?;
        mac.update(message);
        Ok(HmacDigest::from_bytes(mac.finalize().into_bytes().into()))
    }
}

impl std::fmt::Debug for SoftwareKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareKey")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Identifier of a key slot inside a protected hardware region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySlot(pub u8);

impl std::fmt::Display for KeySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Engine that computes HMAC-SHA256 with a key that never leaves hardware
pub trait HardwareHmacEngine: Send + Sync {
    /// Compute the digest of `message` with the secret in `slot`
    ///
    /// # Errors
    ///
    /// Returns an error when the slot is not provisioned or the engine
    /// rejects the operation.
    fn hmac_sha256(&self, slot: KeySlot, message: &[u8]) -> Result<[u8; DIGEST_LEN], AuthError>;
}

/// Key source backed by a hardware-protected secret
#[derive(Clone)]
pub struct HardwareKey {
    engine: Arc<dyn HardwareHmacEngine>,
    slot: KeySlot,
}

impl HardwareKey {
    /// Create a key source over `slot` of the given engine
    pub fn new(engine: Arc<dyn HardwareHmacEngine>, slot: KeySlot) -> Self {
        Self { engine, slot }
    }

    /// The protected slot this key source signs with
    pub fn slot(&self) -> KeySlot {
        self.slot
    }
}

impl KeySource for HardwareKey {
    fn sign(&self, message: &[u8]) -> Result<HmacDigest, AuthError> {
        self.engine
            .hmac_sha256(self.slot, message)
            .map(HmacDigest::from_bytes)
    }
}

impl std::fmt::Debug for HardwareKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareKey")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test engine that holds the secret in memory but exposes only the
    /// digest, like the real hardware would.
    struct FakeEngine {
        secret: Vec<u8>,
        provisioned: bool,
    }

    impl HardwareHmacEngine for FakeEngine {
        fn hmac_sha256(
            &self,
            slot: KeySlot,
            message: &[u8],
        ) -> Result<[u8; DIGEST_LEN], AuthError> {
            if !self.provisioned {
                return Err(AuthError::Hardware(format!("{slot} not provisioned")));
            }
            let software = SoftwareKey::new(self.secret.clone());
            software.sign(message).map(|d| *d.as_bytes())
        }
    }

    #[test]
    fn software_key_signs_deterministically() {
        let key = SoftwareKey::new(b"s3cret".to_vec());
        let a = key.sign(b"message").expect("sign");
        let b = key.sign(b"message").expect("sign");
        assert_eq!(a, b);
    }

    #[test]
    fn software_key_matches_known_vector() {
        let key = SoftwareKey::new(b"s3cret".to_vec());
        let digest = key
            .sign(b"GET\n/config\n1.0.0\n2024-01-01T00:00:00Z\n2024-01-01T00:15:00Z")
            .expect("sign");
        assert_eq!(
            hex::encode(digest.as_bytes()),
            "cb8a5715bfd94b562da1869f5cf90e39bca8c2c9ef07c7d26173db477d3c055e"
        );
    }

    #[test]
    fn software_key_rejects_empty_secret() {
        let key = SoftwareKey::new(Vec::new());
        let result = key.sign(b"message");
        assert!(matches!(result, Err(AuthError::KeyUnavailable(_))));
    }

    #[test]
    fn hardware_key_matches_software_key_for_same_secret() {
        let engine = Arc::new(FakeEngine {
            secret: b"s3cret".to_vec(),
            provisioned: true,
        });
        let hardware = HardwareKey::new(engine, KeySlot(4));
        let software = SoftwareKey::new(b"s3cret".to_vec());

        let a = hardware.sign(b"payload").expect("hardware sign");
        let b = software.sign(b"payload").expect("software sign");
        assert!(a.ct_eq(&b));
    }

    #[test]
    fn hardware_key_surfaces_engine_failure() {
        let engine = Arc::new(FakeEngine {
            secret: Vec::new(),
            provisioned: false,
        });
        let hardware = HardwareKey::new(engine, KeySlot(4));
        assert!(matches!(
            hardware.sign(b"payload"),
            Err(AuthError::Hardware(_))
        ));
    }

    #[test]
    fn digest_base64_round_trip() {
        let key = SoftwareKey::new(b"round-trip".to_vec());
        let digest = key.sign(b"body").expect("sign");
        let encoded = digest.to_base64();
        assert_eq!(encoded.len(), DIGEST_BASE64_LEN);

        let decoded = HmacDigest::from_base64(&encoded).expect("decode");
        assert_eq!(decoded.as_bytes(), digest.as_bytes());
    }

    #[test]
    fn digest_rejects_wrong_length() {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        let short = STANDARD.encode([0u8; 20]);
        assert!(matches!(
            HmacDigest::from_base64(&short),
            Err(AuthError::InvalidDigestLength {
                expected: DIGEST_LEN,
                actual: 20
            })
        ));
    }

    #[test]
    fn digest_rejects_malformed_base64() {
        assert!(matches!(
            HmacDigest::from_base64("not base64!!"),
            Err(AuthError::Base64(_))
        ));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let key = SoftwareKey::new(b"top secret".to_vec());
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("top secret"));
        assert!(rendered.contains("REDACTED"));
    }
}
