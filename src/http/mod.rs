//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → cors.rs (cross-origin policy)
//!     → extract.rs (body → validated RequestDescription, or 422)
//!     → relay executor
//!     → JSON envelope back to the caller
//! ```

pub mod cors;
pub mod extract;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
