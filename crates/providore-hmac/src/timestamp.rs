//! Protocol validity windows
//!
//! Every signed exchange carries a `Created-At`/`Expiry` pair bounding how
//! long the signature is considered valid. Timestamps are rendered in a
//! fixed textual format: RFC3339 UTC at second precision with a `Z` suffix,
//! always 20 characters. The client renders and echoes the window; replay
//! rejection against it is a server-side concern.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Width of a rendered protocol timestamp in bytes.
pub const TIMESTAMP_LEN: usize = 20;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Validity window attached to one signed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    created_at: DateTime<Utc>,
    expiry: DateTime<Utc>,
}

impl TimeWindow {
    /// Window opening now and closing after `validity`
    pub fn starting_now(validity: Duration) -> Self {
        Self::anchored(Utc::now(), validity)
    }

    /// Window anchored at an explicit instant
    pub fn anchored(created_at: DateTime<Utc>, validity: Duration) -> Self {
        Self {
            created_at,
            expiry: created_at + validity,
        }
    }

    /// `Created-At` rendered in the fixed protocol format
    pub fn created_at(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// `Expiry` rendered in the fixed protocol format
    pub fn expiry(&self) -> String {
        self.expiry.format(TIMESTAMP_FORMAT).to_string()
    }
}
