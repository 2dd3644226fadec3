//! The parts of a request that outlive its body.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::ACCEPT_ENCODING;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Method, Request, Uri};

use crate::config::ErrorConfig;
use crate::limits::{PayloadLimits, default_limits};

// Flag to ensure we only log the missing layer warning once per process
static WARNED_MISSING_LAYER: AtomicBool = AtomicBool::new(false);

/// Method, URI, headers and per-request configuration of a request.
///
/// Writing a response or an error needs the request (for Accept-Encoding,
/// trust and trace decisions) after its body has been consumed. A
/// `RequestHead` is captured first and passed to every write call.
///
/// It is usually obtained as an extractor:
///
/// ```rust,ignore
/// async fn handler(head: RequestHead, query: Query) -> Response {
///     let limit = query.get_int("limit");
///     if let Err(err) = query.err() {
///         return write_error(&head, err);
///     }
///     write_response(&head, &list(limit).await)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    config: ErrorConfig,
    limits: PayloadLimits,
}

impl RequestHead {
    /// Capture the head of a request.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self::capture(req.method(), req.uri(), req.headers(), req.extensions())
    }

    /// Capture the head from request parts.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::capture(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
    }

    fn capture(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        let (config, limits) = config_or_default(extensions);
        Self {
            method: method.clone(),
            uri: uri.clone(),
            headers: headers.clone(),
            remote_addr: extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            config,
            limits,
        }
    }

    /// Replace the error configuration.
    pub fn with_config(mut self, config: ErrorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the payload limits.
    pub fn with_limits(mut self, limits: PayloadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the address of the connected peer.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Address of the directly connected peer, if the server was started with
    /// `into_make_service_with_connect_info::<SocketAddr>()`.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The error configuration attached by [`ApiLayer`](crate::ApiLayer).
    pub fn config(&self) -> &ErrorConfig {
        &self.config
    }

    /// The payload limits attached by [`ApiLayer`](crate::ApiLayer).
    pub fn limits(&self) -> PayloadLimits {
        self.limits
    }

    /// The Accept-Encoding header, if present and readable.
    pub fn accept_encoding(&self) -> Option<&str> {
        self.headers
            .get(ACCEPT_ENCODING)
            .and_then(|value| value.to_str().ok())
    }
}

/// Get the per-request configuration from extensions, or the defaults if
/// `ApiLayer` was not applied.
pub(crate) fn config_or_default(extensions: &Extensions) -> (ErrorConfig, PayloadLimits) {
    let config = extensions.get::<ErrorConfig>().cloned();
    let limits = extensions.get::<PayloadLimits>().copied();
    if let (Some(config), Some(limits)) = (&config, limits) {
        return (config.clone(), limits);
    }

    // Log warning once per process to avoid log spam
    if !WARNED_MISSING_LAYER.swap(true, Ordering::Relaxed) {
        tracing::warn!(
            target: "httpapi_axum",
            "ApiLayer not found. Using default error configuration and payload limits."
        );
    }

    (
        config.unwrap_or_default(),
        limits.unwrap_or_else(default_limits),
    )
}

impl<S> FromRequestParts<S> for RequestHead
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
