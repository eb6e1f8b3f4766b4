//! The normalized response envelope and relay execution errors.

use std::error::Error as StdError;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Inner status reported when the relay itself failed.
pub const RELAY_FAILURE_STATUS: u16 = 500;

/// What the caller always gets back from `POST /proxy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Target's HTTP status, or 500 when the relay failed.
    pub status_code: u16,
    /// Target's response headers, flattened to one value per name, in wire order.
    pub headers: IndexMap<String, String>,
    /// Decoded JSON, raw text, or the failure message.
    pub body: Value,
    /// Milliseconds from dispatch to full receipt; 0 on failure.
    pub duration: u64,
}

impl ResponseEnvelope {
    /// Whether this envelope reports a relay-side failure.
    pub fn is_relay_failure(&self) -> bool {
        self.status_code == RELAY_FAILURE_STATUS && self.duration == 0 && self.headers.is_empty()
    }
}

/// Errors raised while executing a relay call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// DNS, connect, TLS, timeout, malformed URL/method/header, body read.
    #[error("An error occurred: {0}")]
    Network(String),

    /// Anything else: client construction, a panicking relay task.
    #[error("An unexpected server error occurred: {0}")]
    Unexpected(String),
}

impl RelayError {
    pub fn network(err: &(dyn StdError + 'static)) -> Self {
        Self::Network(describe(err))
    }

    pub fn unexpected(err: &(dyn StdError + 'static)) -> Self {
        Self::Unexpected(describe(err))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Network(_) => "network_error",
            RelayError::Unexpected(_) => "unexpected_error",
        }
    }
}

impl From<RelayError> for ResponseEnvelope {
    fn from(err: RelayError) -> Self {
        Self {
            status_code: RELAY_FAILURE_STATUS,
            headers: IndexMap::new(),
            body: Value::String(err.to_string()),
            duration: 0,
        }
    }
}

/// Render an error and its source chain as `outer: inner: root`.
pub fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Some errors already embed their cause in their own message.
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
