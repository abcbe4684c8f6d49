//! Firmware update session state machine
//!
//! A firmware upgrade streams the image straight into the device's inactive
//! flash partition while it downloads. The session is a finite-state
//! machine driven one transport event at a time:
//!
//! `Ready → Waiting → InProgress → { Completed | Failed }`
//!
//! `Error` is a sub-state for a failed flash step mid-stream; absent
//! recovery it collapses into `Failed` on the final event. A session only
//! moves forward, reaches exactly one of `Completed`/`Failed`, and raises
//! the completion signal exactly once. Any failure with an open flash
//! write session aborts it so the target partition stays reusable.
//!
//! The session is exclusively owned by the background task that runs it;
//! the caller holds only the one-shot completion channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::client::{PATH_FIRMWARE, ProvidoreClient};
use crate::error::ProvidoreError;
use crate::flash::FlashWriter;
use crate::transport::{
    EVENT_CHANNEL_DEPTH, HttpRequest, Transport, TransportEvent, header_eq, headers,
};

/// States of a firmware update session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OtaState {
    /// Session created, transport not yet connected
    #[default]
    Ready,

    /// Flash write session open, no data received yet
    Waiting,

    /// Image chunks are streaming into flash
    InProgress,

    /// Image written, validated and activated
    Completed,

    /// A flash or stream step failed; resolves to `Failed` on the final
    /// event
    Error,

    /// Session over without a usable image
    Failed,
}

impl OtaState {
    /// Terminal states end the session; all later events are absorbed
    pub fn is_terminal(self) -> bool {
        matches!(self, OtaState::Completed | OtaState::Failed)
    }
}

/// Terminal outcome reported to the caller exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaOutcome {
    /// The new image is written, validated and activated
    Completed,
    /// The session ended without a usable image
    Failed,
}

/// One in-flight firmware update session
#[derive(Debug)]
pub struct OtaSession {
    device_id: String,
    state: OtaState,
    bytes_downloaded: u64,
    writer_open: bool,
    echoed_created_at: String,
    echoed_expiry: String,
    echoed_signature: String,
    started: DateTime<Utc>,
}

impl OtaSession {
    /// Create a session in `Ready` for the given device
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            state: OtaState::Ready,
            bytes_downloaded: 0,
            writer_open: false,
            echoed_created_at: String::new(),
            echoed_expiry: String::new(),
            echoed_signature: String::new(),
            started: Utc::now(),
        }
    }

    /// Current state
    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Image bytes written to flash so far
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }

    /// Device this session updates
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// When the session was created
    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    /// Window and signature headers the server echoed on the stream
    pub fn echoed_headers(&self) -> (&str, &str, &str) {
        (
            &self.echoed_created_at,
            &self.echoed_expiry,
            &self.echoed_signature,
        )
    }

    /// Advance the machine by one transport event
    ///
    /// Returns the terminal outcome on the event that ends the session,
    /// `None` otherwise. Terminal states absorb all further events.
    pub async fn apply(
        &mut self,
        event: TransportEvent,
        flash: &dyn FlashWriter,
    ) -> Option<OtaOutcome> {
        if self.state.is_terminal() {
            return None;
        }

        match event {
            TransportEvent::Connected => self.on_connected(flash).await,
            TransportEvent::Header { name, value } => {
                self.on_header(&name, value);
                None
            }
            TransportEvent::Data(chunk) => self.on_data(&chunk, flash).await,
            TransportEvent::Finished => self.on_finished(flash).await,
            TransportEvent::Disconnected => {
                self.fail("connection closed before the session completed", flash)
                    .await
            }
            TransportEvent::Error(reason) => {
                self.fail(&format!("transport error: {reason}"), flash).await
            }
        }
    }

    async fn on_connected(&mut self, flash: &dyn FlashWriter) -> Option<OtaOutcome> {
        if self.state != OtaState::Ready {
            warn!("ignoring duplicate connect in state {:?}", self.state);
            return None;
        }

        match flash.begin().await {
            Ok(()) => {
                info!("starting firmware download for device: {}", self.device_id);
                self.writer_open = true;
                self.state = OtaState::Waiting;
            }
            Err(err) => {
                error!("could not open flash write session: {err}");
                self.state = OtaState::Error;
            }
        }
        None
    }

    fn on_header(&mut self, name: &str, value: String) {
        if header_eq(name, headers::CREATED_AT) {
            self.echoed_created_at = value;
        } else if header_eq(name, headers::EXPIRY) {
            self.echoed_expiry = value;
        } else if header_eq(name, headers::SIGNATURE) {
            self.echoed_signature = value;
        }
    }

    async fn on_data(&mut self, chunk: &[u8], flash: &dyn FlashWriter) -> Option<OtaOutcome> {
        if self.state == OtaState::Waiting {
            self.state = OtaState::InProgress;
        }
        if self.state != OtaState::InProgress {
            return None;
        }

        match flash.write(chunk).await {
            Ok(()) => {
                self.bytes_downloaded += chunk.len() as u64;
                debug!("written {} bytes", self.bytes_downloaded);
                // Long downloads must not starve the rest of the executor.
                tokio::task::yield_now().await;
            }
            Err(err) => {
                error!("flash write failed: {err}");
                self.state = OtaState::Error;
            }
        }
        None
    }

    async fn on_finished(&mut self, flash: &dyn FlashWriter) -> Option<OtaOutcome> {
        if self.state != OtaState::InProgress {
            let reason = match self.state {
                OtaState::Ready => "stream finished before the download started",
                OtaState::Waiting => "stream finished before any image data arrived",
                _ => "stream finished after an earlier flash failure",
            };
            return self.fail(reason, flash).await;
        }

        if let Err(err) = flash.end().await {
            error!("image finalization failed: {err}");
            return self.fail("image finalization failed", flash).await;
        }
        self.writer_open = false;

        match flash.activate().await {
            Ok(()) => {
                info!(
                    "firmware image activated for device {} after {} bytes",
                    self.device_id, self.bytes_downloaded
                );
                self.state = OtaState::Completed;
                Some(OtaOutcome::Completed)
            }
            Err(err) => {
                error!("partition activation failed: {err}");
                self.state = OtaState::Failed;
                Some(OtaOutcome::Failed)
            }
        }
    }

    async fn fail(&mut self, reason: &str, flash: &dyn FlashWriter) -> Option<OtaOutcome> {
        error!(
            "firmware upgrade failed for device {} in state {:?}: {reason}",
            self.device_id, self.state
        );

        if self.writer_open {
            if let Err(err) = flash.abort().await {
                warn!("flash abort failed: {err}");
            }
            self.writer_open = false;
        }

        self.state = OtaState::Failed;
        Some(OtaOutcome::Failed)
    }
}

/// Run one session to its terminal outcome on the current task
///
/// Consumes transport events until a terminal event resolves the session.
/// If the event stream dries up without one (the transport failed outright
/// or dropped its sink early), the session is resolved as a disconnect.
/// The outcome is sent over `done` exactly once.
pub(crate) async fn run_ota_session(
    mut session: OtaSession,
    transport: Arc<dyn Transport>,
    flash: Arc<dyn FlashWriter>,
    request: HttpRequest,
    done: oneshot::Sender<OtaOutcome>,
) {
    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);

    let transport_task = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { transport.perform(request, events_tx).await })
    };

    let mut outcome = None;
    while let Some(event) = events_rx.recv().await {
        if let Some(terminal) = session.apply(event, flash.as_ref()).await {
            outcome = Some(terminal);
            break;
        }
    }

    let outcome = match outcome {
        Some(terminal) => terminal,
        None => {
            match transport_task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!("firmware transport failed: {err}"),
                Err(err) => error!("firmware transport task aborted: {err}"),
            }
            session
                .apply(TransportEvent::Disconnected, flash.as_ref())
                .await
                .unwrap_or(OtaOutcome::Failed)
        }
    };

    if done.send(outcome).is_err() {
        warn!("firmware upgrade caller went away before completion");
    }
}

/// Single-flight guard for firmware upgrades
///
/// The device has one OTA target partition, so only one upgrade session may
/// be in flight at a time system-wide.
#[derive(Debug, Default)]
pub struct UpdateGuard {
    in_flight: AtomicBool,
    device: RwLock<Option<String>>,
}

impl UpdateGuard {
    /// Create an idle guard
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            device: RwLock::new(None),
        }
    }

    /// True while an upgrade session is in flight
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the in-flight slot for `device_id`
    ///
    /// # Errors
    ///
    /// Returns [`ProvidoreError::UpdateInProgress`] naming the device that
    /// holds the slot.
    pub async fn begin(&self, device_id: &str) -> Result<(), ProvidoreError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let current = self.device.read().await;
            let name = current.as_deref().unwrap_or("unknown");
            return Err(ProvidoreError::UpdateInProgress(name.to_string()));
        }

        let mut device = self.device.write().await;
        *device = Some(device_id.to_string());
        Ok(())
    }

    /// Release the in-flight slot
    pub async fn end(&self) {
        let device_id = self.device.write().await.take();
        if let Some(id) = device_id {
            info!("firmware upgrade session closed for device: {}", id);
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

impl ProvidoreClient {
    /// Download and install a firmware image, blocking until the session
    /// resolves
    ///
    /// The request is signed exactly like a config fetch, for `GET
    /// /firmware`. The state machine runs on a background task that owns
    /// the session; this call waits on the one-shot completion channel and
    /// maps `Completed` to `Ok(())`, anything else to
    /// [`ProvidoreError::FirmwareUpgradeFailed`].
    ///
    /// There is no timeout on the wait in this minimal design; deployments
    /// that cannot tolerate an unbounded block on a silent peer should wrap
    /// this call in `tokio::time::timeout`.
    ///
    /// # Errors
    ///
    /// - [`ProvidoreError::UpdateInProgress`] when a session is already in
    ///   flight
    /// - [`ProvidoreError::Credentials`] / [`ProvidoreError::Signing`] when
    ///   the request cannot be built
    /// - [`ProvidoreError::FirmwareUpgradeFailed`] when the session ends in
    ///   `Failed`
    pub async fn initiate_firmware_upgrade(&self) -> Result<(), ProvidoreError> {
        let device_id = self.provisioned_device_id().await?;
        self.guard.begin(&device_id).await?;

        let result = self.run_upgrade(&device_id).await;
        self.guard.end().await;
        result
    }

    async fn run_upgrade(&self, device_id: &str) -> Result<(), ProvidoreError> {
        let request = self.signed_request(PATH_FIRMWARE, device_id)?;
        info!("initiating firmware upgrade for device: {}", device_id);

        let session = OtaSession::new(device_id);
        let (done_tx, done_rx) = oneshot::channel();

        let _session_task = tokio::spawn(run_ota_session(
            session,
            Arc::clone(&self.transport),
            Arc::clone(&self.flash),
            request,
            done_tx,
        ));

        match done_rx.await {
            Ok(OtaOutcome::Completed) => Ok(()),
            Ok(OtaOutcome::Failed) => Err(ProvidoreError::FirmwareUpgradeFailed),
            Err(_) => {
                error!("firmware upgrade session dropped without an outcome");
                Err(ProvidoreError::FirmwareUpgradeFailed)
            }
        }
    }
}
