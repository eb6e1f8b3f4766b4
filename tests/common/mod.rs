//! Shared utilities for integration tests: mock targets and a live relay.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, RawQuery},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use http_relay::{HttpServer, RelayConfig, Shutdown};

/// Start a target server with a handful of fixed behaviors.
pub async fn start_target() -> SocketAddr {
    let app = Router::new()
        .route("/ok", get(|| async { Json(json!({"a": 1})) }))
        .route("/text", get(|| async { "hello world" }))
        .route("/echo", post(echo))
        .route("/query", get(|Query(q): Query<HashMap<String, String>>| async move { Json(q) }))
        .route("/raw-query", get(|RawQuery(q): RawQuery| async move { q.unwrap_or_default() }))
        .route("/precise", get(precise))
        .route("/headers", get(received_headers))
        .route("/inspect", any(inspect))
        .route("/cookies", get(cookies))
        .route("/teapot", get(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                "finally"
            }),
        )
        .route(
            "/stall",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn received_headers(headers: HeaderMap) -> Json<Value> {
    let map: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
        .collect();
    Json(json!(map))
}

async fn inspect(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    Json(json!({
        "method": method.as_str(),
        "content_type": headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        "body_len": body.len(),
    }))
}

/// JSON whose exact digits and key order must survive the relay.
pub const PRECISE_JSON: &str = r#"{"id":123456789012345678901234567890,"z":1,"a":2}"#;

async fn precise() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], PRECISE_JSON)
}

/// `{"zipped":true,"n":1}` gzip-compressed.
pub const GZIPPED_JSON: [u8; 41] = [
    0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x03, 0xab, 0x56, 0xaa, 0xca, 0x2c,
    0x28, 0x48, 0x4d, 0x51, 0xb2, 0x2a, 0x29, 0x2a, 0x4d, 0xd5, 0x51, 0xca, 0x53, 0xb2, 0x32,
    0xac, 0x05, 0x00, 0xe0, 0xb1, 0x0f, 0xbe, 0x15, 0x00, 0x00, 0x00,
];

async fn cookies() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, "a=1".parse().unwrap());
    headers.append(header::SET_COOKIE, "b=2".parse().unwrap());
    (headers, "")
}

/// Start a raw TCP target that reads the request and writes `response` verbatim.
pub async fn start_raw_target(response: impl Into<Vec<u8>>) -> SocketAddr {
    let response: Arc<Vec<u8>> = Arc::new(response.into());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let _ = socket.write_all(&response).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A relay running on an ephemeral port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl RunningRelay {
    pub fn endpoint(&self) -> String {
        format!("http://{}/proxy", self.addr)
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_relay(mut config: RelayConfig) -> RunningRelay {
    config.listener.bind_address = "127.0.0.1:0".into();
    config.static_files.enabled = false;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let stop = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    RunningRelay { addr, shutdown }
}

/// POST a JSON description to the relay and decode the JSON reply.
pub async fn relay(relay: &RunningRelay, description: Value) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(relay.endpoint())
        .json(&description)
        .send()
        .await
        .expect("relay unreachable");
    let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
    let body = res.json().await.expect("relay replied with non-JSON");
    (status, body)
}
