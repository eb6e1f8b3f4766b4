//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! JSON body of POST /proxy
//!     → request.rs (schema validation → RequestDescription)
//!     → executor.rs (assemble, time, normalize)
//!     → transport.rs (scoped reqwest client, one call)
//!     → envelope.rs (ResponseEnvelope, RelayError → 500 envelope)
//! ```
//!
//! # Design Decisions
//! - Stateless: nothing survives a single call
//! - Input-shape errors are rejected before the executor runs
//! - Execution errors are typed and always reduced to an envelope

pub mod envelope;
pub mod executor;
pub mod request;
pub mod transport;

pub use envelope::{RelayError, ResponseEnvelope};
pub use executor::RelayExecutor;
pub use request::{validate, FieldError, RequestDescription, SchemaValidationError};
pub use transport::{OutboundRequest, ReqwestTransport, ScopedClient, TargetResponse, Transport};
