//! Bounded response accumulation for the config exchange
//!
//! The caller sizes the output buffer; response bytes past that capacity
//! are dropped, never written past it. The accumulated state also captures
//! the three headers the server echoes back for verification.

use serde::{Deserialize, Serialize};

use crate::transport::{TransportEvent, header_eq, headers};

/// Growable byte buffer with a hard capacity
///
/// The stored prefix always equals the first `capacity` bytes fed in;
/// overflow sets a flag instead of writing.
#[derive(Debug, Clone)]
pub struct BoundedBuffer {
    data: Vec<u8>,
    capacity: usize,
    truncated: bool,
}

impl BoundedBuffer {
    /// Create an empty buffer that will hold at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
            truncated: false,
        }
    }

    /// Append as much of `input` as fits
    pub fn extend_truncating(&mut self, input: &[u8]) {
        let room = self.capacity.saturating_sub(self.data.len());
        let take = room.min(input.len());
        self.data.extend_from_slice(&input[..take]);
        if take < input.len() {
            self.truncated = true;
        }
    }

    /// Bytes accumulated so far
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes accumulated
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when any input byte was dropped
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Consume the buffer, returning the accumulated bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Accumulated state of one authenticated config exchange
#[derive(Debug)]
pub struct ResponseCapture {
    body: BoundedBuffer,
    created_at: String,
    expiry: String,
    signature: String,
}

impl ResponseCapture {
    /// Create a capture with a body buffer of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            body: BoundedBuffer::with_capacity(capacity),
            created_at: String::new(),
            expiry: String::new(),
            signature: String::new(),
        }
    }

    /// Consume one transport event
    pub fn apply(&mut self, event: &TransportEvent) {
        match event {
            TransportEvent::Header { name, value } => {
                if header_eq(name, headers::CREATED_AT) {
                    self.created_at = value.clone();
                } else if header_eq(name, headers::EXPIRY) {
                    self.expiry = value.clone();
                } else if header_eq(name, headers::SIGNATURE) {
                    self.signature = value.clone();
                }
            }
            TransportEvent::Data(chunk) => self.body.extend_truncating(chunk),
            TransportEvent::Connected
            | TransportEvent::Finished
            | TransportEvent::Disconnected
            | TransportEvent::Error(_) => {}
        }
    }

    /// Accumulated response body
    pub fn body(&self) -> &[u8] {
        self.body.as_slice()
    }

    /// Echoed `Created-At` header, empty if never received
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Echoed `Expiry` header, empty if never received
    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    /// Server signature header, empty if never received
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Consume the capture into the payload handed to the caller
    pub fn into_payload(self) -> ConfigPayload {
        let truncated = self.body.truncated();
        ConfigPayload {
            bytes: self.body.into_bytes(),
            truncated,
        }
    }
}

/// Verified configuration bytes returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPayload {
    /// Response body, at most the requested capacity
    pub bytes: Vec<u8>,
    /// True when the response exceeded the capacity and was cut short
    pub truncated: bool,
}

impl ConfigPayload {
    /// Number of verified bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the verified body is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_stores_input_up_to_capacity() {
        let mut buffer = BoundedBuffer::with_capacity(8);
        buffer.extend_truncating(b"0123");
        buffer.extend_truncating(b"4567");
        assert_eq!(buffer.as_slice(), b"01234567");
        assert!(!buffer.truncated());
    }

    #[test]
    fn buffer_drops_excess_without_overflow() {
        let mut buffer = BoundedBuffer::with_capacity(8);
        buffer.extend_truncating(b"0123456789");
        assert_eq!(buffer.as_slice(), b"01234567");
        assert_eq!(buffer.len(), 8);
        assert!(buffer.truncated());

        buffer.extend_truncating(b"more");
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn buffer_splits_a_chunk_straddling_the_cap() {
        let mut buffer = BoundedBuffer::with_capacity(6);
        buffer.extend_truncating(b"0123");
        buffer.extend_truncating(b"4567");
        assert_eq!(buffer.as_slice(), b"012345");
        assert!(buffer.truncated());
    }

    #[test]
    fn zero_capacity_buffer_accepts_nothing() {
        let mut buffer = BoundedBuffer::with_capacity(0);
        buffer.extend_truncating(b"anything");
        assert!(buffer.is_empty());
        assert!(buffer.truncated());
    }

    #[test]
    fn capture_collects_echoed_headers_case_insensitively() {
        let mut capture = ResponseCapture::with_capacity(64);
        capture.apply(&TransportEvent::Header {
            name: "created-at".to_string(),
            value: "2024-01-01T00:00:00Z".to_string(),
        });
        capture.apply(&TransportEvent::Header {
            name: "EXPIRY".to_string(),
            value: "2024-01-01T00:15:00Z".to_string(),
        });
        capture.apply(&TransportEvent::Header {
            name: "Signature".to_string(),
            value: "c2ln".to_string(),
        });
        capture.apply(&TransportEvent::Header {
            name: "Content-Type".to_string(),
            value: "application/octet-stream".to_string(),
        });

        assert_eq!(capture.created_at(), "2024-01-01T00:00:00Z");
        assert_eq!(capture.expiry(), "2024-01-01T00:15:00Z");
        assert_eq!(capture.signature(), "c2ln");
    }

    #[test]
    fn capture_accumulates_body_chunks() {
        let mut capture = ResponseCapture::with_capacity(16);
        capture.apply(&TransportEvent::Connected);
        capture.apply(&TransportEvent::Data(b"hello ".to_vec()));
        capture.apply(&TransportEvent::Data(b"config".to_vec()));
        capture.apply(&TransportEvent::Finished);

        assert_eq!(capture.body(), b"hello config");
        let payload = capture.into_payload();
        assert_eq!(payload.bytes, b"hello config");
        assert!(!payload.truncated);
    }
}
