//! Response authenticity verification
//!
//! The server signs its response over `body\ncreated_at\nexpiry` with the
//! same shared secret and attaches the base64 digest in a `Signature`
//! header. The client recomputes the digest and compares in constant time.
//! On mismatch the entire payload is untrusted and must be discarded; there
//! is no partially-trusted state.

use std::sync::Arc;

use tracing::debug;

use crate::error::AuthError;
use crate::key_source::{HmacDigest, KeySource};

/// Verifies server responses against the device key
pub struct ResponseVerifier {
    key: Arc<dyn KeySource>,
}

impl ResponseVerifier {
    /// Create a verifier over the provisioned key source
    pub fn new(key: Arc<dyn KeySource>) -> Self {
        Self { key }
    }

    /// Check a response against the signature the server presented
    ///
    /// Recomputes the digest over `body\ncreated_at\nexpiry` and compares it
    /// against `signature_b64` in constant time. A malformed or
    /// wrong-length signature is a mismatch, not an error: the caller must
    /// discard the payload either way.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthError`] only when the key source itself cannot
    /// sign.
    pub fn verify(
        &self,
        body: &[u8],
        created_at: &str,
        expiry: &str,
        signature_b64: &str,
    ) -> Result<bool, AuthError> {
        let mut message = Vec::with_capacity(body.len() + created_at.len() + expiry.len() + 2);
        message.extend_from_slice(body);
        message.push(b'\n');
        message.extend_from_slice(created_at.as_bytes());
        message.push(b'\n');
        message.extend_from_slice(expiry.as_bytes());

        let expected = self.key.sign(&message)?;

        let presented = match HmacDigest::from_base64(signature_b64) {
            Ok(digest) => digest,
            Err(err) => {
                debug!("rejecting unparseable response signature: {err}");
                return Ok(false);
            }
        };

        Ok(expected.ct_eq(&presented))
    }
}

impl std::fmt::Debug for ResponseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_source::SoftwareKey;
    use proptest::prelude::*;

    const CREATED_AT: &str = "2024-01-01T00:00:00Z";
    const EXPIRY: &str = "2024-01-01T00:15:00Z";

    fn sign_response(secret: &[u8], body: &[u8], created_at: &str, expiry: &str) -> String {
        let mut message = Vec::from(body);
        message.push(b'\n');
        message.extend_from_slice(created_at.as_bytes());
        message.push(b'\n');
        message.extend_from_slice(expiry.as_bytes());
        SoftwareKey::new(secret.to_vec())
            .sign(&message)
            .expect("sign")
            .to_base64()
    }

    fn verifier(secret: &[u8]) -> ResponseVerifier {
        ResponseVerifier::new(Arc::new(SoftwareKey::new(secret.to_vec())))
    }

    #[test]
    fn accepts_matching_signature() {
        let signature = sign_response(b"s3cret", b"hello config", CREATED_AT, EXPIRY);
        let matched = verifier(b"s3cret")
            .verify(b"hello config", CREATED_AT, EXPIRY, &signature)
            .expect("verify");
        assert!(matched);

        // Pinned alongside the request oracle to catch encoding drift.
        assert_eq!(signature, "e9+vIElYazD78fZCYMFduH3U8Lc1OioM32RasKHuAKI=");
    }

    #[test]
    fn rejects_signature_from_different_secret() {
        let forged = sign_response(b"wrong-secret", b"hello config", CREATED_AT, EXPIRY);
        let matched = verifier(b"s3cret")
            .verify(b"hello config", CREATED_AT, EXPIRY, &forged)
            .expect("verify");
        assert!(!matched);
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign_response(b"s3cret", b"hello config", CREATED_AT, EXPIRY);
        let matched = verifier(b"s3cret")
            .verify(b"hello confiG", CREATED_AT, EXPIRY, &signature)
            .expect("verify");
        assert!(!matched);
    }

    #[test]
    fn rejects_tampered_timestamps() {
        let signature = sign_response(b"s3cret", b"hello config", CREATED_AT, EXPIRY);
        let v = verifier(b"s3cret");

        let created_shifted = v
            .verify(b"hello config", "2024-01-01T00:00:01Z", EXPIRY, &signature)
            .expect("verify");
        assert!(!created_shifted);

        let expiry_shifted = v
            .verify(b"hello config", CREATED_AT, "2024-01-01T00:16:00Z", &signature)
            .expect("verify");
        assert!(!expiry_shifted);
    }

    #[test]
    fn malformed_signature_is_a_mismatch_not_an_error() {
        let v = verifier(b"s3cret");
        let matched = v
            .verify(b"hello config", CREATED_AT, EXPIRY, "!!not-base64!!")
            .expect("verify");
        assert!(!matched);

        let truncated = v
            .verify(b"hello config", CREATED_AT, EXPIRY, "AAAA")
            .expect("verify");
        assert!(!truncated);
    }

    #[test]
    fn empty_headers_never_match() {
        let signature = sign_response(b"s3cret", b"hello config", CREATED_AT, EXPIRY);
        let matched = verifier(b"s3cret")
            .verify(b"hello config", "", "", &signature)
            .expect("verify");
        assert!(!matched);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_flipping_any_body_byte_breaks_verification(
            body in prop::collection::vec(any::<u8>(), 1..256),
            flip in any::<prop::sample::Index>(),
        ) {
            let signature = sign_response(b"s3cret", &body, CREATED_AT, EXPIRY);
            let v = verifier(b"s3cret");

            let intact = v.verify(&body, CREATED_AT, EXPIRY, &signature)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(intact);

            let mut tampered = body.clone();
            let at = flip.index(tampered.len());
            tampered[at] ^= 0x01;
            let matched = v.verify(&tampered, CREATED_AT, EXPIRY, &signature)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(!matched);
        }

        #[test]
        fn prop_verification_is_deterministic(
            body in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let signature = sign_response(b"s3cret", &body, CREATED_AT, EXPIRY);
            let v = verifier(b"s3cret");
            let first = v.verify(&body, CREATED_AT, EXPIRY, &signature)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let second = v.verify(&body, CREATED_AT, EXPIRY, &signature)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(first, second);
            prop_assert!(first);
        }
    }
}
