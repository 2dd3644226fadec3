//! Request body size limits.
//!
//! Bodies are buffered in memory before they are decoded, so every read is
//! bounded. The default limit of 16 MiB applies unless [`ApiLayer`] attaches a
//! different one or a process-wide default is installed at startup.
//!
//! [`ApiLayer`]: crate::layer::ApiLayer

use std::sync::OnceLock;

/// Default maximum request body size (16 MiB).
pub const DEFAULT_MAX_BYTES: usize = 16 * 1024 * 1024;

static DEFAULT_LIMITS: OnceLock<PayloadLimits> = OnceLock::new();

/// Configuration for request body size limits.
///
/// A body whose size reaches the maximum is rejected with `413 Payload Too
/// Large`; the largest body accepted is one byte smaller.
///
/// # Example
///
/// ```rust
/// use httpapi_axum::PayloadLimits;
///
/// // Use default 16 MiB limit
/// let limits = PayloadLimits::default();
///
/// // Custom 1 MiB limit for small JSON documents
/// let limits = PayloadLimits::new(1024 * 1024);
/// assert_eq!(limits.max_bytes(), 1024 * 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadLimits {
    max_bytes: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl PayloadLimits {
    /// Create limits with the specified maximum body size in bytes.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Returns the maximum body size. Bodies of this size or larger are rejected.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Returns true if a body of `len` bytes is too large.
    pub fn exceeded_by(&self, len: u64) -> bool {
        len >= self.max_bytes as u64
    }
}

/// Install the limits used for requests that did not pass through [`ApiLayer`].
///
/// Can only be called once, normally at startup. Returns the limits back if a
/// default was already installed or already read.
///
/// [`ApiLayer`]: crate::layer::ApiLayer
pub fn install_default_limits(limits: PayloadLimits) -> Result<(), PayloadLimits> {
    DEFAULT_LIMITS.set(limits)
}

/// The process-wide default limits.
pub fn default_limits() -> PayloadLimits {
    *DEFAULT_LIMITS.get_or_init(PayloadLimits::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = PayloadLimits::default();
        assert_eq!(limits.max_bytes(), 16 * 1024 * 1024);
    }

    #[test]
    fn test_custom_limits() {
        let limits = PayloadLimits::new(1024);
        assert_eq!(limits.max_bytes(), 1024);
    }

    #[test]
    fn test_exceeded_by() {
        let limits = PayloadLimits::new(1024);
        assert!(!limits.exceeded_by(0));
        assert!(!limits.exceeded_by(1023));
        assert!(limits.exceeded_by(1024));
        assert!(limits.exceeded_by(9_999_999_999));
    }
}
