//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, optional timeout)
//!     → routing::bypass (non-GET outside the API prefix → API Server)
//!     → pages (GET page routes) or fallback (→ API Server)
//!     → headers.rs (policy applied on both legs of every page fetch)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod server;

pub use headers::{HeaderPolicy, PolicyError};
pub use request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, GatewayState, HttpServer};
