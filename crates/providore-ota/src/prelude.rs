//! Convenience re-exports for common usage
//!
//! ```
//! use providore_ota::prelude::*;
//! ```

pub use crate::client::{ClientConfig, PATH_CONFIG, PATH_FIRMWARE, ProvidoreClient};
pub use crate::credentials::{CredentialStore, check_provisioning};
pub use crate::error::ProvidoreError;
pub use crate::flash::{FlashError, FlashWriter};
pub use crate::ota::{OtaOutcome, OtaSession, OtaState, UpdateGuard};
pub use crate::response::{BoundedBuffer, ConfigPayload, ResponseCapture};
pub use crate::self_test::{BootControl, ImageState, SelfTestController};
pub use crate::transport::{HttpRequest, Transport, TransportError, TransportEvent, headers};

pub use providore_hmac::prelude::*;
