//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and resources produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters, latency histogram, failure counters)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for log aggregation)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
