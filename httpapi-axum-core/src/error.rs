//! Error kinds and types for JSON Web API handling.
//!
//! This module provides:
//! - [`ErrorKind`]: Classification of failures and their HTTP status
//! - [`ApiError`]: The error returned by payload, query and handler code
//! - [`PayloadError`]: Low-level detail kept as the source of an `ApiError`
//! - [`PublicStatus`], [`PublicMessage`], [`PublicCode`]: Capabilities marking
//!   the parts of an error that are safe to disclose to any client

use std::borrow::Cow;
use std::fmt;

use http::StatusCode;

/// Boxed error accepted by the error writing functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of an [`ApiError`].
///
/// `BadRequest`, `PayloadTooLarge` and `Public` carry a status that may be shown
/// to clients. The remaining kinds are internal failures: clients only ever see
/// a generic 500 for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, undecodable or otherwise unacceptable input (400).
    BadRequest,
    /// Request body at or above the configured maximum (413).
    PayloadTooLarge,
    /// Content-Encoding that has no decoder.
    UnsupportedEncoding,
    /// Decoder failed on the compressed content.
    Decompression,
    /// Encoder failed while compressing a response.
    Compression,
    /// Value could not be encoded as JSON.
    Serialization,
    /// Response could not be produced.
    Io,
    /// Caller-classified error with a public status.
    Public(StatusCode),
}

impl ErrorKind {
    /// Get the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::UnsupportedEncoding => "unsupported_encoding",
            ErrorKind::Decompression => "decompression",
            ErrorKind::Compression => "compression",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Io => "io",
            ErrorKind::Public(_) => "public",
        }
    }

    /// The status that may be disclosed to clients, if any.
    pub fn public_status(&self) -> Option<StatusCode> {
        match self {
            ErrorKind::BadRequest => Some(StatusCode::BAD_REQUEST),
            ErrorKind::PayloadTooLarge => Some(StatusCode::PAYLOAD_TOO_LARGE),
            ErrorKind::Public(status) => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the status and message of this kind are public.
    pub fn is_public(&self) -> bool {
        self.public_status().is_some()
    }
}

/// Exposes an HTTP status that is safe to send to any client.
pub trait PublicStatus {
    fn public_status(&self) -> Option<StatusCode>;
}

/// Exposes a message that is safe to send to any client.
///
/// The message excludes codes and wrapped causes, which are reported separately.
pub trait PublicMessage {
    fn public_message(&self) -> Option<&str>;
}

/// Exposes a machine-readable error code that is safe to send to any client.
pub trait PublicCode {
    fn public_code(&self) -> Option<&str>;
}

/// An error carrying a kind, a message, an optional code and an optional cause.
///
/// Whether the message is shown to clients depends on the kind: public kinds
/// disclose status and message, internal kinds disclose nothing. The code is
/// public whenever it is set. The cause is internal detail and is only ever
/// shown to trusted clients.
///
/// # Example
///
/// ```
/// use httpapi_axum_core::{ApiError, PublicMessage, PublicStatus};
/// use http::StatusCode;
///
/// let err = ApiError::not_found("user not found").with_code("USR404");
/// assert_eq!(err.public_status(), Some(StatusCode::NOT_FOUND));
/// assert_eq!(err.public_message(), Some("user not found"));
/// assert_eq!(err.to_string(), "user not found [USR404]");
/// ```
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    code: Option<String>,
    source: Option<BoxError>,
}

impl ApiError {
    /// Create a new error with a kind and message.
    pub fn new<S: Into<Cow<'static, str>>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Create an error whose status and message are shown to clients.
    pub fn public<S: Into<Cow<'static, str>>>(status: StatusCode, message: S) -> Self {
        Self::new(ErrorKind::Public(status), message)
    }

    /// Create a bad request (400) error.
    pub fn bad_request<S: Into<Cow<'static, str>>>(message: S) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Create a payload too large (413) error.
    pub fn payload_too_large<S: Into<Cow<'static, str>>>(message: S) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, message)
    }

    /// Create a not found (404) error.
    pub fn not_found<S: Into<Cow<'static, str>>>(message: S) -> Self {
        Self::public(StatusCode::NOT_FOUND, message)
    }

    /// The error used when there is nothing known about a failure.
    pub fn no_information() -> Self {
        Self::public(
            StatusCode::INTERNAL_SERVER_ERROR,
            "no information available",
        )
    }

    /// Create an unsupported content-encoding error.
    pub fn unsupported_encoding(encoding: &str) -> Self {
        Self::new(ErrorKind::UnsupportedEncoding, "unknown content-encoding")
            .with_source(PayloadError::UnknownEncoding(encoding.to_string()))
    }

    /// Create a decompression error.
    pub fn decompression(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Decompression, "cannot decompress content").with_source(err)
    }

    /// Create a compression error.
    pub fn compression(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Compression, "cannot compress content").with_source(err)
    }

    /// Create a serialization error.
    pub fn serialization(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Serialization, "cannot marshal JSON").with_source(err)
    }

    /// Create an error for a response that could not be produced.
    pub fn io<E: Into<BoxError>>(err: E) -> Self {
        Self::new(ErrorKind::Io, "cannot write response").with_source(err)
    }

    /// Attach a public error code.
    pub fn with_code<S: Into<String>>(mut self, code: S) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the underlying cause.
    pub fn with_source<E: Into<BoxError>>(mut self, source: E) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the message, without code or cause.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error code.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The public status, or 500 for internal kinds.
    pub fn status(&self) -> StatusCode {
        self.kind
            .public_status()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl PublicStatus for ApiError {
    fn public_status(&self) -> Option<StatusCode> {
        self.kind.public_status()
    }
}

impl PublicMessage for ApiError {
    fn public_message(&self) -> Option<&str> {
        self.kind.is_public().then_some(self.message())
    }
}

impl PublicCode for ApiError {
    fn public_code(&self) -> Option<&str> {
        self.code()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

impl From<std::convert::Infallible> for ApiError {
    fn from(infallible: std::convert::Infallible) -> Self {
        match infallible {}
    }
}

/// Detail about a failed body read or decode.
///
/// Kept as the source of the public [`ApiError`], so that logs and trusted
/// clients see what actually went wrong.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Content-Length header is not a non-negative integer.
    #[error("content-length {0:?} is not a non-negative integer")]
    InvalidContentLength(String),

    /// Declared Content-Length is at or above the limit.
    #[error("content-length {declared} is not below the limit of {max} bytes")]
    DeclaredTooLarge { declared: u64, max: usize },

    /// Body ended before the declared length was read.
    #[error("body ended after {read} of {declared} bytes")]
    ShortRead { read: usize, declared: usize },

    /// Body without a declared length reached the limit.
    #[error("body reached the limit of {max} bytes")]
    LimitReached { max: usize },

    /// The transport failed while streaming the body.
    #[error("reading body: {0}")]
    Stream(#[source] BoxError),

    /// Content-Encoding with no decoder.
    #[error("unknown content-encoding {0:?}")]
    UnknownEncoding(String),
}
