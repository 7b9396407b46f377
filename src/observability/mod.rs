//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and handlers produce:
//!     → logging.rs (structured log events, request ID on every line)
//!     → metrics.rs (request counters, latency histogram, route misses)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from middleware into every handler log line
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
