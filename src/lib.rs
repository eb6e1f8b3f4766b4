//! HTTP relay library.
//!
//! Accepts a JSON description of an outbound HTTP request, executes it
//! against the target, and answers with a normalized envelope.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{RelayError, RelayExecutor, RequestDescription, ResponseEnvelope};
