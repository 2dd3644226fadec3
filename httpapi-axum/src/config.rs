//! Configuration of how errors are presented, marshalled and reported.
//!
//! An [`ErrorConfig`] holds four optional callbacks. It is attached to each
//! request by [`ApiLayer`](crate::ApiLayer) and read back by
//! [`write_error`](crate::write_error). Callbacks left unset fall back to the
//! process-wide default configuration, and from there to the built-in
//! behavior:
//!
//! | callback  | built-in behavior                                   |
//! |-----------|-----------------------------------------------------|
//! | `trace`   | no trace identifier                                 |
//! | `trust`   | no client is trusted with error detail              |
//! | `marshal` | [`marshal_content`], indented JSON                  |
//! | `notify`  | [`log_error`], a `tracing` event per written error  |

use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use httpapi_axum_core::{ErrorContent, marshal_content};

use crate::head::RequestHead;

/// Returns an identifier for correlating an error response with logs or traces.
pub type TraceFn = Arc<dyn Fn(&RequestHead) -> Option<String> + Send + Sync>;

/// Decides whether a client may see the details of an error.
pub type TrustFn = Arc<dyn Fn(&RequestHead) -> bool + Send + Sync>;

/// Marshals error content into the response body.
pub type MarshalFn = Arc<dyn Fn(&ErrorContent) -> Bytes + Send + Sync>;

/// Called after an error response has been produced.
pub type NotifyFn = Arc<dyn Fn(&RequestHead, &ErrorContent) + Send + Sync>;

static DEFAULT_CONFIG: OnceLock<ErrorConfig> = OnceLock::new();

/// Callbacks used when writing error responses.
///
/// # Example
///
/// ```rust
/// use httpapi_axum::{ErrorConfig, trust_loopback};
///
/// let config = ErrorConfig::new()
///     .trust(trust_loopback)
///     .trace(|head| {
///         head.headers()
///             .get("x-request-id")
///             .and_then(|v| v.to_str().ok())
///             .map(str::to_string)
///     });
/// ```
#[derive(Clone, Default)]
pub struct ErrorConfig {
    trace: Option<TraceFn>,
    trust: Option<TrustFn>,
    marshal: Option<MarshalFn>,
    notify: Option<NotifyFn>,
}

impl ErrorConfig {
    /// Create a configuration with every callback unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trace identifier callback.
    pub fn trace<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestHead) -> Option<String> + Send + Sync + 'static,
    {
        self.trace = Some(Arc::new(f));
        self
    }

    /// Set the trust predicate.
    pub fn trust<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestHead) -> bool + Send + Sync + 'static,
    {
        self.trust = Some(Arc::new(f));
        self
    }

    /// Set the content marshaller.
    pub fn marshal<F>(mut self, f: F) -> Self
    where
        F: Fn(&ErrorContent) -> Bytes + Send + Sync + 'static,
    {
        self.marshal = Some(Arc::new(f));
        self
    }

    /// Set the callback invoked after each error response is produced.
    pub fn notify<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestHead, &ErrorContent) + Send + Sync + 'static,
    {
        self.notify = Some(Arc::new(f));
        self
    }

    /// Trace identifier for the request, if any.
    pub fn trace_id(&self, head: &RequestHead) -> Option<String> {
        match self.resolve(|c| c.trace.as_ref()) {
            Some(f) => f(head),
            None => None,
        }
    }

    /// Returns true if the client may see error detail.
    pub fn is_trusted(&self, head: &RequestHead) -> bool {
        match self.resolve(|c| c.trust.as_ref()) {
            Some(f) => f(head),
            None => false,
        }
    }

    /// Marshal error content into a response body.
    pub fn marshal_content(&self, content: &ErrorContent) -> Bytes {
        match self.resolve(|c| c.marshal.as_ref()) {
            Some(f) => f(content),
            None => marshal_content(content),
        }
    }

    /// Report an error response that has been produced.
    pub fn error_written(&self, head: &RequestHead, content: &ErrorContent) {
        match self.resolve(|c| c.notify.as_ref()) {
            Some(f) => f(head, content),
            None => log_error(head, content),
        }
    }

    fn resolve<'a, T>(&'a self, field: impl Fn(&'a ErrorConfig) -> Option<&'a T>) -> Option<&'a T> {
        field(self).or_else(|| DEFAULT_CONFIG.get().and_then(field))
    }
}

impl fmt::Debug for ErrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorConfig")
            .field("trace", &self.trace.is_some())
            .field("trust", &self.trust.is_some())
            .field("marshal", &self.marshal.is_some())
            .field("notify", &self.notify.is_some())
            .finish()
    }
}

/// Install the configuration whose callbacks are used wherever a
/// per-request configuration leaves one unset.
///
/// Can only be called once, normally at startup. Returns the configuration
/// back if a default was already installed.
pub fn install_default_error_config(config: ErrorConfig) -> Result<(), ErrorConfig> {
    DEFAULT_CONFIG.set(config)
}

/// Trust predicate that trusts clients connected directly over loopback.
///
/// Requests forwarded by a local reverse proxy also arrive over loopback, so
/// only use this when the server is reached without one.
pub fn trust_loopback(head: &RequestHead) -> bool {
    match head.remote_addr().map(|addr| addr.ip()) {
        Some(IpAddr::V4(ip)) => ip.is_loopback(),
        Some(IpAddr::V6(ip)) => {
            ip.is_loopback() || ip.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
        None => false,
    }
}

/// Default notifier: one `tracing` event per error response.
///
/// Server errors are logged at `WARN`, everything else at `DEBUG`.
pub fn log_error(head: &RequestHead, content: &ErrorContent) {
    let status = content.status().as_u16();
    let code = content.code.as_deref().unwrap_or_default();
    let trace = content.trace.as_deref().unwrap_or_default();
    let error = content
        .error
        .as_ref()
        .map(|err| err.to_string())
        .unwrap_or_default();

    if content.status().is_server_error() {
        tracing::warn!(
            method = %head.method(),
            path = head.uri().path(),
            status,
            code,
            trace,
            error = %error,
            "{}",
            content.message
        );
    } else {
        tracing::debug!(
            method = %head.method(),
            path = head.uri().path(),
            status,
            code,
            trace,
            error = %error,
            "{}",
            content.message
        );
    }
}
