//! # GitHub REST Core
//!
//! The request/response machinery shared by every GitHub REST resource method:
//! - Request construction against a configurable base URL (JSON bodies,
//!   content negotiation, API version and credentials)
//! - Pagination options encoding and `Link` header decoding
//! - A response envelope exposing pagination and rate-limit metadata
//! - Typed errors separating construction, transport, API and rate-limit failures
//! - Cooperative cancellation and per-call deadlines, with no hidden retries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_github_core::{
//!     AttestationsResponse, GitHubClient, ListOptions, RequestContext, NO_BODY,
//! };
//! use reqwest::Method;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitHubClient::builder().pat("ghp_xxxxxxxxxxxx").build()?;
//!
//!     let request = client
//!         .new_request(Method::GET, "repos/octocat/hello-world/attestations/sha256:abc", NO_BODY)?
//!         .with_options(Some(&ListOptions::new().per_page(50)))?;
//!
//!     let (list, response): (AttestationsResponse, _) =
//!         client.execute(&RequestContext::background(), request).await?;
//!
//!     println!(
//!         "{} attestations, next page {:?}, {} requests left",
//!         list.attestations.len(),
//!         response.pages().next_page,
//!         response.rate().remaining
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// Request construction and dispatch
pub mod client;
pub mod request;
pub mod response;
pub mod transport;

// Pagination handling
pub mod pagination;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::AuthMethod;
pub use client::{GitHubClient, GitHubClientBuilder};
pub use config::{GitHubConfig, GitHubConfigBuilder};
pub use errors::{
    ApiError, ApiErrorKind, ErrorKind, FieldError, GitHubError, GitHubResult, RateLimitError,
    RateLimitKind, TransportError, TransportErrorKind,
};
pub use pagination::{ListCursorOptions, ListOptions, ListResponse, PageInfo, PaginationLinks};
pub use request::{Request, RequestContext, NO_BODY};
pub use response::{Rate, Response};
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};
pub use types::*;
