//! Core payload and error types for httpapi-axum.
//!
//! This crate holds everything that does not depend on a particular HTTP
//! server: the [`Payload`] buffer with its compression and JSON handling, the
//! [`ApiError`] type with its public-disclosure capabilities, and the
//! [`ErrorContent`] envelope written to clients.
//!
//! ## Modules
//!
//! - [`error`]: Error kinds, `ApiError` and the `Public*` capability traits
//! - [`codec`]: Compression codec trait and the gzip/deflate implementations
//! - [`compression`]: Content-Encoding values and Accept-Encoding matching
//! - [`payload`]: Request/response body buffer
//! - [`content`]: Error envelope and its default JSON shape

mod codec;
mod compression;
mod content;
mod error;
mod payload;

pub use codec::*;
pub use compression::*;
pub use content::*;
pub use error::*;
pub use payload::*;
