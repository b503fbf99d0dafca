//! Backend-for-frontend gateway for the framework directory.
//!
//! Renders the directory's pages from API Server data, relays the API's
//! cookies, and hands every mutation and unknown path to the API Server.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod pages;
pub mod routing;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
