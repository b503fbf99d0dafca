//! Everything that talks to the API Server.
//!
//! # Data Flow
//! ```text
//! page handler
//!     → fetch.rs (single / fan-out GET, classify → FetchOutcome)
//!     → csrf.rs (token for form pages)
//!     → client.rs (header policy, hyper client)
//!     → API Server
//!
//! bypass / fallback
//!     → client.rs forward (request passed through whole)
//!
//! submit.rs (CLI, tests)
//!     → client.rs send → SubmitOutcome
//! ```

pub mod client;
pub mod csrf;
pub mod fetch;
pub mod submit;

pub use client::{http_client, ApiClient, ApiOrigin, HttpClient, UpstreamResponse};
pub use csrf::{CsrfToken, AUTHENTICITY_TOKEN};
pub use fetch::{outcome_for, outcome_for_all, FetchOutcome, Fetched};
pub use submit::{
    classify_submission, session_cookies, LoadingSignal, SubmitBody, SubmitClient, SubmitOutcome,
    Submission, ValidationErrors,
};
