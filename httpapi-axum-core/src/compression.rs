//! Content-Encoding values and response compression negotiation.
//!
//! Uses standard HTTP headers: `Content-Encoding` / `Accept-Encoding`.

use crate::codec::{BoxedCodec, DeflateCodec, GzipCodec};

/// Extra bytes a compressed response carries: `len("Content-Encoding: gzip\r\n")`.
pub const ENCODING_OVERHEAD: usize = 24;

/// Bodies shorter than this are never worth compressing.
pub const MIN_COMPRESS_BYTES: usize = ENCODING_OVERHEAD * 4;

/// Content encoding of a payload.
///
/// Request encodings are trusted verbatim, so an unknown value is kept as
/// [`ContentEncoding::Other`] and only rejected when the payload is decompressed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Deflate,
    Gzip,
    Other(String),
}

impl ContentEncoding {
    /// Parse from a Content-Encoding header value. Empty means identity.
    pub fn from_header(value: &str) -> Self {
        match value {
            "" | "identity" => Self::Identity,
            "gzip" => Self::Gzip,
            "deflate" => Self::Deflate,
            other => Self::Other(other.to_string()),
        }
    }

    /// Get the header value string for this encoding.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Identity => "identity",
            Self::Deflate => "deflate",
            Self::Gzip => "gzip",
            Self::Other(value) => value,
        }
    }

    /// Returns true if this encoding is identity (no compression).
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Get the codec for this encoding.
    ///
    /// Returns `None` for identity and for encodings without a decoder.
    pub fn codec(&self) -> Option<BoxedCodec> {
        match self {
            Self::Gzip => Some(BoxedCodec::new(GzipCodec::default())),
            Self::Deflate => Some(BoxedCodec::new(DeflateCodec::default())),
            Self::Identity | Self::Other(_) => None,
        }
    }
}

/// Returns true if the client will take a gzip response.
///
/// Simple: if gzip appears anywhere in Accept-Encoding, use it. Quality values
/// are not parsed, so `gzip;q=0` is still treated as acceptable.
pub fn accepts_gzip(accept: Option<&str>) -> bool {
    matches!(accept, Some(s) if s.contains("gzip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_encoding_from_header() {
        assert_eq!(ContentEncoding::from_header(""), ContentEncoding::Identity);
        assert_eq!(
            ContentEncoding::from_header("identity"),
            ContentEncoding::Identity
        );
        assert_eq!(ContentEncoding::from_header("gzip"), ContentEncoding::Gzip);
        assert_eq!(
            ContentEncoding::from_header("deflate"),
            ContentEncoding::Deflate
        );
        assert_eq!(
            ContentEncoding::from_header("br"),
            ContentEncoding::Other("br".to_string())
        );
    }

    #[test]
    fn test_content_encoding_as_str() {
        assert_eq!(ContentEncoding::Identity.as_str(), "identity");
        assert_eq!(ContentEncoding::Gzip.as_str(), "gzip");
        assert_eq!(ContentEncoding::Deflate.as_str(), "deflate");
        assert_eq!(ContentEncoding::Other("zstd".into()).as_str(), "zstd");
    }

    #[test]
    fn test_content_encoding_codec() {
        assert!(ContentEncoding::Identity.codec().is_none());
        assert!(ContentEncoding::Other("br".into()).codec().is_none());
        assert_eq!(ContentEncoding::Gzip.codec().unwrap().name(), "gzip");
        assert_eq!(ContentEncoding::Deflate.codec().unwrap().name(), "deflate");
    }

    #[test]
    fn test_accepts_gzip() {
        assert!(accepts_gzip(Some("gzip")));
        assert!(accepts_gzip(Some("gzip, deflate, br")));
        assert!(accepts_gzip(Some("deflate, gzip")));

        assert!(!accepts_gzip(Some("deflate, br")));
        assert!(!accepts_gzip(Some("")));
        assert!(!accepts_gzip(None));
    }

    #[test]
    fn test_accepts_gzip_ignores_quality() {
        // Known limitation: q=0 is not treated as a refusal.
        assert!(accepts_gzip(Some("gzip;q=0")));
    }
}
