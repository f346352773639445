//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Request handler produces:
//!     → access.rs (one line per request, banded by status class)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never pre-formatted strings
//! - Request ID flows into the access log
//! - Metrics exporter runs on its own listener, off by default

pub mod access;
pub mod logging;
pub mod metrics;
