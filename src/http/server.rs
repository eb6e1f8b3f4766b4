//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay endpoint and static front-end
//! - Wire up middleware (CORS, request ID, tracing, body limit)
//! - Bind server to listener and stop gracefully

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Request},
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::RelayConfig;
use crate::http::cors::build_cors_layer;
use crate::http::extract::RelayRequest;
use crate::http::request::{request_id_of, UuidRequestId};
use crate::lifecycle::{shutdown, signals};
use crate::relay::{RelayExecutor, ResponseEnvelope};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub executor: RelayExecutor,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a server that relays through `reqwest`.
    pub fn new(config: RelayConfig) -> Self {
        let executor = RelayExecutor::with_client_config(config.client.clone());
        Self::with_executor(config, executor)
    }

    /// Create a server around an explicit executor.
    pub fn with_executor(config: RelayConfig, executor: RelayExecutor) -> Self {
        let router = Self::build_router(&config, AppState { executor });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/proxy", post(proxy_handler))
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .with_state(state);

        if config.static_files.enabled {
            let dir = PathBuf::from(&config.static_files.dir);
            let index = dir.join(&config.static_files.index);
            router = router
                .route_service("/", ServeFile::new(index))
                .nest_service("/static", ServeDir::new(dir));
        }

        router
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id_of(request.headers()),
                )
            }))
            .layer(build_cors_layer(&config.cors))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a signal arrives or `stop` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        stop: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            static_files = self.config.static_files.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = signals::shutdown_signal() => {},
                    _ = shutdown::triggered(stop) => {},
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// `POST /proxy`: relay the described request; always answers 200.
async fn proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    RelayRequest(desc): RelayRequest,
) -> Json<ResponseEnvelope> {
    let span = tracing::debug_span!("relay", request_id = %request_id_of(&headers));
    Json(state.executor.relay(desc).instrument(span).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{RelayError, ScopedClient, Transport};
    use axum::http::{header, Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Counts `open` calls and always fails the connection.
    #[derive(Default)]
    struct CountingTransport {
        opened: AtomicUsize,
    }

    impl Transport for CountingTransport {
        fn open(&self) -> Result<Box<dyn ScopedClient>, RelayError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Err(RelayError::Network("connection refused".into()))
        }
    }

    fn server() -> (HttpServer, Arc<CountingTransport>) {
        let transport = Arc::new(CountingTransport::default());
        let mut config = RelayConfig::default();
        config.static_files.dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static").into();
        config.security.max_body_size = 1024;
        let server = HttpServer::with_executor(config, RelayExecutor::new(transport.clone()));
        (server, transport)
    }

    fn post_proxy(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/proxy")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_fields_rejected_before_any_outbound_call() {
        let (server, transport) = server();

        for body in [r#"{"url": "http://a.test"}"#, r#"{"method": "GET"}"#, "{}"] {
            let response = server.router().oneshot(post_proxy(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let detail = json_body(response).await;
            assert_eq!(detail["detail"][0]["type"], "missing");
        }

        assert_eq!(transport.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_header_type_is_rejected() {
        let (server, transport) = server();
        let response = server
            .router()
            .oneshot(post_proxy(
                r#"{"method": "GET", "url": "http://a.test", "headers": "x"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let detail = json_body(response).await;
        assert_eq!(detail["detail"][0]["loc"], json!(["body", "headers"]));
        assert_eq!(transport.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let (server, _) = server();
        let response = server.router().oneshot(post_proxy("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["detail"][0]["type"], "json_invalid");
    }

    #[tokio::test]
    async fn non_json_content_type_is_rejected() {
        let (server, _) = server();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/proxy")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"method": "GET", "url": "http://a.test"}"#))
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (server, transport) = server();
        let body = json!({"method": "POST", "url": "http://a.test", "body": "x".repeat(4096)});
        let response = server
            .router()
            .oneshot(post_proxy(&body.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(transport.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn execution_failure_is_still_http_200() {
        let (server, transport) = server();
        let response = server
            .router()
            .oneshot(post_proxy(r#"{"method": "get", "url": "http://a.test"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let envelope = json_body(response).await;
        assert_eq!(
            envelope,
            json!({
                "status_code": 500,
                "headers": {},
                "body": "An error occurred: connection refused",
                "duration": 0
            })
        );
        assert_eq!(transport.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caller_request_id_is_propagated() {
        let (server, _) = server();
        let mut request = post_proxy(r#"{"method": "GET", "url": "http://a.test"}"#);
        request
            .headers_mut()
            .insert("x-request-id", "caller-123".parse().unwrap());

        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "caller-123");
    }

    #[tokio::test]
    async fn preflight_from_any_origin_is_allowed() {
        let (server, _) = server();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/proxy")
            .header(header::ORIGIN, "http://some-frontend.test")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();
        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://some-frontend.test"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn serves_front_end_index() {
        let (server, _) = server();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("<html"));
    }

    #[tokio::test]
    async fn static_files_can_be_disabled() {
        let mut config = RelayConfig::default();
        config.static_files.enabled = false;
        let server = HttpServer::with_executor(
            config,
            RelayExecutor::new(Arc::new(CountingTransport::default())),
        );

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
