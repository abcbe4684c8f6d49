//! Convenience re-exports for common usage
//!
//! ```
//! use providore_hmac::prelude::*;
//! ```

pub use crate::error::AuthError;
pub use crate::key_source::{
    DIGEST_BASE64_LEN, DIGEST_LEN, HardwareHmacEngine, HardwareKey, HmacDigest, KeySlot, KeySource,
    SoftwareKey,
};
pub use crate::signer::{AuthToken, RequestSigner, SigningMaterial};
pub use crate::timestamp::{TIMESTAMP_LEN, TimeWindow};
pub use crate::verifier::ResponseVerifier;
