//! # httpapi-axum
//!
//! Conventions for JSON Web APIs built with [Axum](https://github.com/tokio-rs/axum).
//!
//! This crate does not route requests or serve connections. It gives handlers
//! a consistent way to:
//!
//! - **Read requests:** [`read_request`] and the [`ApiRequest`] extractor read a
//!   bounded body (optionally gzip or deflate encoded) and decode it as JSON.
//! - **Write responses:** [`write_response`] encodes a value as JSON and gzips
//!   it when the client accepts it and it pays off.
//! - **Read query strings:** [`Query`] parses typed parameters and reports all
//!   invalid ones together in one `400 Bad Request`.
//! - **Write errors:** [`write_error`] sends a JSON error envelope that only
//!   discloses what the error marks public, with full detail for trusted
//!   clients. [`ApiLayer`] configures this per request.
//!
//! ## Getting Started
//!
//! ```rust,ignore
//! use axum::{Router, routing::post};
//! use httpapi_axum::prelude::*;
//!
//! async fn post_something(
//!     head: RequestHead,
//!     ApiRequest(input): ApiRequest<PostSomethingInput>,
//! ) -> Response {
//!     write_result(&head, post_something_impl(input).await)
//! }
//!
//! let app = Router::new()
//!     .route("/api/something", post(post_something))
//!     .layer(ApiLayer::new());
//! ```
//!
//! The `httpapi-axum-examples` crate has a complete server.

pub mod config;
pub mod handler;
pub mod head;
pub mod layer;
pub mod limits;
pub mod present;
pub mod query;
pub mod request;
pub mod response;

pub use config::{
    ErrorConfig, MarshalFn, NotifyFn, TraceFn, TrustFn, install_default_error_config, log_error,
    trust_loopback,
};
pub use handler::{HandlerFn, handler_fn};
pub use head::RequestHead;
pub use layer::{ApiLayer, ApiService};
pub use limits::{DEFAULT_MAX_BYTES, PayloadLimits, default_limits, install_default_limits};
pub use present::{present, present_with, write_error, write_error_with};
pub use query::Query;
pub use request::{ApiRequest, read_payload, read_payload_with, read_request};
pub use response::{write_response, write_result};

// Re-export the core crate's types
pub use httpapi_axum_core::{
    ApiError, BoxError, ErrorContent, ErrorKind, Payload, PublicCode, PublicMessage,
    PublicStatus, marshal_content,
};

// Re-export several crates
pub use chrono;
pub use serde;

pub mod prelude {
    //! A prelude for `httpapi-axum` providing the most common types.
    pub use crate::config::{ErrorConfig, trust_loopback};
    pub use crate::handler::handler_fn;
    pub use crate::head::RequestHead;
    pub use crate::layer::ApiLayer;
    pub use crate::limits::PayloadLimits;
    pub use crate::present::write_error;
    pub use crate::query::Query;
    pub use crate::request::{ApiRequest, read_request};
    pub use crate::response::{write_response, write_result};
    pub use axum::response::Response;
    pub use httpapi_axum_core::ApiError;
}
