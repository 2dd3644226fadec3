//! Middleware attaching per-request configuration.
//!
//! [`ApiLayer`] stores an [`ErrorConfig`] and [`PayloadLimits`] in the
//! extensions of every request passing through it. Extractors and the
//! read/write functions pick them up from there:
//!
//! ```rust,ignore
//! use httpapi_axum::{ApiLayer, ErrorConfig, PayloadLimits, trust_loopback};
//!
//! let app = Router::new()
//!     .route("/api/something", post(post_something).get(get_something))
//!     .layer(
//!         ApiLayer::new()
//!             .limits(PayloadLimits::new(1024 * 1024))
//!             .error_config(ErrorConfig::new().trust(trust_loopback)),
//!     );
//! ```
//!
//! Requests that did not pass through the layer use the process-wide defaults,
//! and a warning is logged once.

use std::task::{Context, Poll};

use axum::http::Request;
use tower::{Layer, Service};

use crate::config::ErrorConfig;
use crate::limits::{PayloadLimits, default_limits};

/// Layer that attaches error configuration and payload limits to requests.
#[derive(Clone, Debug)]
pub struct ApiLayer {
    config: ErrorConfig,
    limits: PayloadLimits,
}

impl Default for ApiLayer {
    fn default() -> Self {
        Self {
            config: ErrorConfig::default(),
            limits: default_limits(),
        }
    }
}

impl ApiLayer {
    /// Create a layer with an empty error configuration and the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload limits.
    pub fn limits(mut self, limits: PayloadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the error configuration.
    ///
    /// Callbacks it leaves unset still fall back to the process-wide default.
    pub fn error_config(mut self, config: ErrorConfig) -> Self {
        self.config = config;
        self
    }
}

impl<S> Layer<S> for ApiLayer {
    type Service = ApiService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiService {
            inner,
            config: self.config.clone(),
            limits: self.limits,
        }
    }
}

/// Service created by [`ApiLayer`].
#[derive(Clone, Debug)]
pub struct ApiService<S> {
    inner: S,
    config: ErrorConfig,
    limits: PayloadLimits,
}

impl<S, B> Service<Request<B>> for ApiService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.config.clone());
        req.extensions_mut().insert(self.limits);
        self.inner.call(req)
    }
}
