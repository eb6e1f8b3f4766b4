//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay handler and executor produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every relay log line through the handler span
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
