//! Relay execution: one described request in, one envelope out.
//!
//! # Data Flow
//! ```text
//! RequestDescription
//!     → OutboundRequest::from_description (method, body rule)
//!     → Transport::open (scoped client)
//!     → ScopedClient::dispatch (timed)
//!     → decode body, flatten headers
//!     → ResponseEnvelope
//! ```
//!
//! # Design Decisions
//! - `relay` never fails: every `RelayError` becomes a 500 envelope
//! - The call runs in its own task so a panic is reported, not propagated
//! - Duration is rounded half away from zero

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::Instrument;

use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::relay::envelope::{RelayError, ResponseEnvelope};
use crate::relay::request::RequestDescription;
use crate::relay::transport::{OutboundRequest, ReqwestTransport, Transport};

/// Executes relay calls through a `Transport`.
#[derive(Clone)]
pub struct RelayExecutor {
    transport: Arc<dyn Transport>,
}

impl RelayExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Executor backed by `reqwest`, one client per call.
    pub fn with_client_config(config: ClientConfig) -> Self {
        Self::new(Arc::new(ReqwestTransport::new(config)))
    }

    /// Relay one request. Always returns an envelope.
    pub async fn relay(&self, desc: RequestDescription) -> ResponseEnvelope {
        let method = desc.method.to_ascii_uppercase();
        let this = self.clone();
        let task = async move { this.execute(desc).await }.instrument(tracing::Span::current());
        let outcome = match tokio::spawn(task).await {
            Ok(result) => result,
            Err(join_err) => Err(RelayError::unexpected(&join_err)),
        };

        match outcome {
            Ok((envelope, elapsed)) => {
                metrics::record_relay(&method, "ok", Some(elapsed));
                tracing::info!(
                    method = %method,
                    status_code = envelope.status_code,
                    duration_ms = envelope.duration,
                    "Relay completed"
                );
                envelope
            }
            Err(err) => {
                metrics::record_relay(&method, err.kind(), None);
                tracing::warn!(method = %method, error = %err, "Relay failed");
                err.into()
            }
        }
    }

    /// Execute without mapping failures, returning the measured elapsed time too.
    pub async fn execute(
        &self,
        desc: RequestDescription,
    ) -> Result<(ResponseEnvelope, Duration), RelayError> {
        let outbound = OutboundRequest::from_description(desc)?;
        let client = self.transport.open()?;

        tracing::debug!(
            method = %outbound.method,
            url = %outbound.url,
            has_payload = outbound.payload.is_some(),
            "Dispatching outbound request"
        );

        let start = Instant::now();
        let response = client.dispatch(outbound).await?;
        let elapsed = start.elapsed();

        let envelope = ResponseEnvelope {
            status_code: response.status,
            headers: flatten_headers(&response.headers),
            body: decode_body(&response.body),
            duration: round_millis(elapsed),
        };
        Ok((envelope, elapsed))
    }
}

/// Whole milliseconds, rounded half away from zero.
pub fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}

/// JSON if the body parses as JSON, raw text otherwise.
///
/// Numbers keep their literal digits and objects keep their key order.
pub fn decode_body(body: &Bytes) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// One entry per header name in first-seen order; repeats are joined with `", "`.
pub fn flatten_headers(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut flat: IndexMap<String, String> = IndexMap::new();
    for (name, value) in headers {
        // Latin-1: every byte maps to one char, so nothing is rejected.
        let text: String = value.as_bytes().iter().map(|&b| b as char).collect();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&text);
            })
            .or_insert(text);
    }
    flat
}
