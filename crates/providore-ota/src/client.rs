//! Client configuration and capability wiring

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialStore;
use crate::error::ProvidoreError;
use crate::flash::FlashWriter;
use crate::ota::UpdateGuard;
use crate::transport::{HttpRequest, Transport, headers};
use providore_hmac::{KeySource, RequestSigner, ResponseVerifier, SigningMaterial, TimeWindow};

/// Path of the configuration resource.
pub const PATH_CONFIG: &str = "/config";

/// Path of the firmware image resource.
pub const PATH_FIRMWARE: &str = "/firmware";

/// Configuration for a Providore client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server base URL, joined with the protocol paths
    pub base_url: String,

    /// Firmware version the device runs; reported in `X-Firmware-Version`
    /// and signed into every canonical string
    pub firmware_version: semver::Version,

    /// Validity window attached to each signed request, in seconds
    pub auth_validity_secs: u32,

    /// Capacity of the config response buffer when the caller does not
    /// size it explicitly
    pub default_config_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://providore.local".to_string(),
            firmware_version: semver::Version::new(1, 0, 0),
            auth_validity_secs: 15 * 60,
            default_config_capacity: 1024,
        }
    }
}

impl ClientConfig {
    /// Absolute URL for a protocol path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn validity(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.auth_validity_secs))
    }
}

/// Client-side engine of the Providore protocol
///
/// Wires the consumed capabilities together: a streaming [`Transport`], a
/// [`KeySource`] chosen at provisioning time, the [`CredentialStore`]
/// holding the device identity, and the [`FlashWriter`] over the OTA
/// target partition.
pub struct ProvidoreClient {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) flash: Arc<dyn FlashWriter>,
    pub(crate) signer: RequestSigner,
    pub(crate) verifier: ResponseVerifier,
    pub(crate) guard: Arc<UpdateGuard>,
}

impl ProvidoreClient {
    /// Create a client over the given capabilities
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        key_source: Arc<dyn KeySource>,
        credentials: Arc<dyn CredentialStore>,
        flash: Arc<dyn FlashWriter>,
    ) -> Self {
        Self {
            config,
            transport,
            credentials,
            flash,
            signer: RequestSigner::new(Arc::clone(&key_source)),
            verifier: ResponseVerifier::new(key_source),
            guard: Arc::new(UpdateGuard::new()),
        }
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// True while a firmware upgrade session is in flight
    pub fn upgrade_in_flight(&self) -> bool {
        self.guard.is_in_flight()
    }

    pub(crate) async fn provisioned_device_id(&self) -> Result<String, ProvidoreError> {
        self.credentials
            .device_id()
            .await
            .map_err(|err| ProvidoreError::Credentials(format!("{err:#}")))
    }

    /// Build the authenticated GET request for `path`
    pub(crate) fn signed_request(
        &self,
        path: &str,
        device_id: &str,
    ) -> Result<HttpRequest, ProvidoreError> {
        let window = TimeWindow::starting_now(self.config.validity());
        let material = SigningMaterial::new(
            "GET",
            path,
            self.config.firmware_version.to_string(),
            &window,
        );
        let token = self.signer.sign(device_id, &material)?;

        Ok(HttpRequest::get(self.config.url_for(path))
            .header(
                headers::FIRMWARE_VERSION,
                self.config.firmware_version.to_string(),
            )
            .header(headers::AUTHORIZATION, token.header_value())
            .header(headers::CREATED_AT, material.created_at)
            .header(headers::EXPIRY, material.expiry))
    }
}

impl std::fmt::Debug for ProvidoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidoreClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_protocol_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.auth_validity_secs, 900);
        assert_eq!(config.default_config_capacity, 1024);
        assert_eq!(config.firmware_version, semver::Version::new(1, 0, 0));
    }

    #[test]
    fn url_join_handles_trailing_slash() {
        let config = ClientConfig {
            base_url: "https://updates.example.com/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.url_for(PATH_CONFIG),
            "https://updates.example.com/config"
        );

        let bare = ClientConfig {
            base_url: "https://updates.example.com".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            bare.url_for(PATH_FIRMWARE),
            "https://updates.example.com/firmware"
        );
    }
}
