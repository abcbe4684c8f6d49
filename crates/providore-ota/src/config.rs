//! The authenticated configuration exchange
//!
//! One signed `GET /config`, one verified response. The exchange completes
//! within the caller's own await: the transport streams events into a
//! bounded capture, and the body is only released to the caller after the
//! server's signature over it checks out.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::client::{PATH_CONFIG, ProvidoreClient};
use crate::error::ProvidoreError;
use crate::response::{ConfigPayload, ResponseCapture};
use crate::transport::EVENT_CHANNEL_DEPTH;

impl ProvidoreClient {
    /// Fetch the signed configuration blob with the configured buffer size
    ///
    /// # Errors
    ///
    /// See [`fetch_config_with_capacity`](Self::fetch_config_with_capacity).
    pub async fn fetch_config(&self) -> Result<ConfigPayload, ProvidoreError> {
        self.fetch_config_with_capacity(self.config.default_config_capacity)
            .await
    }

    /// Fetch the signed configuration blob into a buffer of
    /// `output_capacity` bytes
    ///
    /// Response bytes past the capacity are dropped, never written past it.
    /// The payload is returned only when the server's signature over the
    /// accumulated body and echoed window verifies; on mismatch the whole
    /// response is discarded. No retries happen here; retry policy belongs
    /// to the caller.
    ///
    /// # Errors
    ///
    /// - [`ProvidoreError::Credentials`] when the device id is unreadable
    /// - [`ProvidoreError::Signing`] when the request cannot be signed
    /// - [`ProvidoreError::Transport`] when the exchange fails outright
    /// - [`ProvidoreError::SignatureMismatch`] when the response is not
    ///   authentic
    pub async fn fetch_config_with_capacity(
        &self,
        output_capacity: usize,
    ) -> Result<ConfigPayload, ProvidoreError> {
        let device_id = self.provisioned_device_id().await?;
        let request = self.signed_request(PATH_CONFIG, &device_id)?;

        info!("fetching configuration for device: {}", device_id);

        let mut capture = ResponseCapture::with_capacity(output_capacity);
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);

        let perform = self.transport.perform(request, events_tx);
        let consume = async {
            while let Some(event) = events_rx.recv().await {
                capture.apply(&event);
            }
        };
        let (result, ()) = tokio::join!(perform, consume);
        result?;

        let authentic = self.verifier.verify(
            capture.body(),
            capture.created_at(),
            capture.expiry(),
            capture.signature(),
        )?;

        if !authentic {
            warn!(
                "configuration response failed signature verification; discarding {} bytes",
                capture.body().len()
            );
            return Err(ProvidoreError::SignatureMismatch);
        }

        let payload = capture.into_payload();
        info!("configuration verified: {} bytes", payload.len());
        Ok(payload)
    }
}
