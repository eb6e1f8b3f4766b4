//! Outbound transport: the seam between the executor and the network.
//!
//! # Responsibilities
//! - Assemble the outbound call (`OutboundRequest`) from a description
//! - Acquire a scoped client for exactly one call
//! - Dispatch and read the full target response
//!
//! # Design Decisions
//! - A `ScopedClient` is consumed by `dispatch`, so its connections are
//!   released when the call finishes, whatever the outcome
//! - Every transport-level fault maps to `RelayError::Network`
//! - Client construction failure is `RelayError::Unexpected`
//! - Redirects are not followed: a 3xx is the target's answer
//! - Compressed bodies (gzip, deflate, br) are decoded before they are returned
//! - Caller headers and params go out in the order the caller gave them

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::relay::envelope::RelayError;
use crate::relay::request::RequestDescription;

/// Methods whose body is forwarded.
const BODY_METHODS: [Method; 3] = [Method::POST, Method::PUT, Method::PATCH];

/// A fully assembled outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Option<IndexMap<String, String>>,
    pub params: Option<IndexMap<String, String>>,
    /// JSON payload; `None` means no body at all.
    pub payload: Option<Value>,
}

impl OutboundRequest {
    /// Build the outbound call, applying method normalization and the body rule.
    pub fn from_description(desc: RequestDescription) -> Result<Self, RelayError> {
        let method = normalize_method(&desc.method)?;
        let payload = outbound_payload(&method, desc.body);
        Ok(Self {
            method,
            url: desc.url,
            headers: desc.headers,
            params: desc.params,
            payload,
        })
    }
}

/// Uppercase the verb and parse it as an HTTP method token.
pub fn normalize_method(method: &str) -> Result<Method, RelayError> {
    let upper = method.to_ascii_uppercase();
    Method::from_bytes(upper.as_bytes())
        .map_err(|e| RelayError::Network(format!("{e}: {upper:?}")))
}

/// The body is sent only for POST/PUT/PATCH and only when it is truthy.
pub fn outbound_payload(method: &Method, body: Option<Value>) -> Option<Value> {
    body.filter(|b| BODY_METHODS.contains(method) && is_truthy(b))
}

/// JSON truthiness: null, false, zero, and empty strings/arrays/objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// The target's answer, fully buffered.
#[derive(Debug, Clone)]
pub struct TargetResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Source of per-call clients.
pub trait Transport: Send + Sync {
    /// Acquire a client scoped to a single call.
    fn open(&self) -> Result<Box<dyn ScopedClient>, RelayError>;
}

/// A client that lives for one dispatch.
#[async_trait]
pub trait ScopedClient: Send {
    async fn dispatch(self: Box<Self>, request: OutboundRequest)
        -> Result<TargetResponse, RelayError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Transport for ReqwestTransport {
    fn open(&self) -> Result<Box<dyn ScopedClient>, RelayError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none());
        if let Some(secs) = self.config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        let client = builder.build().map_err(|e| RelayError::unexpected(&e))?;
        Ok(Box::new(ReqwestScopedClient { client }))
    }
}

struct ReqwestScopedClient {
    client: reqwest::Client,
}

#[async_trait]
impl ScopedClient for ReqwestScopedClient {
    async fn dispatch(
        self: Box<Self>,
        request: OutboundRequest,
    ) -> Result<TargetResponse, RelayError> {
        let mut builder = self.client.request(request.method, request.url.as_str());
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(params) = &request.params {
            builder = builder.query(params);
        }
        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|e| RelayError::network(&e))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| RelayError::network(&e))?;

        Ok(TargetResponse {
            status,
            headers,
            body,
        })
    }
}
