//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pages, bypass, upstream client
//!     → logging.rs (tracing events, text or JSON)
//!     → metrics.rs (counters and histograms, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line via the tower-http layers
//! - Metrics calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
