//! Streaming transport capability
//!
//! The engine never speaks HTTP itself; it hands an [`HttpRequest`] to a
//! [`Transport`] implementation and consumes the exchange as a stream of
//! [`TransportEvent`]s delivered over a channel. Connection security (TLS)
//! is the transport's concern.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Protocol header names
pub mod headers {
    /// Firmware version the device is currently running
    pub const FIRMWARE_VERSION: &str = "X-Firmware-Version";
    /// HMAC authorization token
    pub const AUTHORIZATION: &str = "Authorization";
    /// Validity window opening timestamp
    pub const CREATED_AT: &str = "Created-At";
    /// Validity window closing timestamp
    pub const EXPIRY: &str = "Expiry";
    /// Server signature over its own response
    pub const SIGNATURE: &str = "Signature";
}

/// Depth of the event channel between a transport and a session.
pub(crate) const EVENT_CHANNEL_DEPTH: usize = 16;

/// One event from an in-flight exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection to the server established
    Connected,
    /// One response header arrived
    Header {
        /// Header name as received; matched case-insensitively
        name: String,
        /// Header value
        value: String,
    },
    /// One chunk of response body
    Data(Vec<u8>),
    /// Response stream ended normally
    Finished,
    /// Peer closed the connection
    Disconnected,
    /// Transport-level failure mid-stream
    Error(String),
}

/// Transport failures outside the event stream
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection could not be established (DNS, TCP)
    #[error("connection failed: {0}")]
    Connect(String),

    /// TLS negotiation or certificate failure
    #[error("TLS failure: {0}")]
    Tls(String),

    /// The exchange did not complete in time
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The peer violated the protocol
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Request description handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method, uppercase
    pub method: String,
    /// Absolute request URL
    pub url: String,
    /// Headers to send, in order
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Build a GET request for `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Append one header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| header_eq(n, name))
            .map(|(_, v)| v.as_str())
    }
}

/// Capability that runs one HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run the exchange, delivering events into `events` as they occur
    ///
    /// Returns once the exchange is over. An `Err` means the exchange could
    /// not run at all; failures mid-stream arrive as
    /// [`TransportEvent::Error`] instead. Implementations must stop sending
    /// once the receiver is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the exchange could not be started or
    /// completed at the transport level.
    async fn perform(
        &self,
        request: HttpRequest,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError>;
}

/// Case-insensitive header name comparison
pub(crate) fn header_eq(name: &str, expected: &str) -> bool {
    name.eq_ignore_ascii_case(expected)
}
