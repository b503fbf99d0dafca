//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → bypass.rs (BypassRule decides)
//!         ToApi       → API Server answers
//!         PassThrough → page routes, or api_fallback when none match
//! ```
//!
//! # Design Decisions
//! - Rule compiled from config, immutable until the next reload
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always gets the same decision

pub mod bypass;
pub mod matcher;

pub use bypass::{api_fallback, bypass_middleware, BypassRule, RouteDecision};
