//! Compression codec trait and implementations.
//!
//! This module provides the [`Codec`] trait for whole-body compression and
//! implementations for the encodings a payload may declare:
//! - [`GzipCodec`]: Gzip compression
//! - [`DeflateCodec`]: Deflate compression

use bytes::Bytes;
use flate2::Compression as FlateLevel;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Codec trait for body compression.
///
/// Payloads only ever use the gzip and deflate codecs in this module, picked
/// by [`ContentEncoding::codec`](crate::ContentEncoding::codec).
///
/// # Example
///
/// ```
/// use httpapi_axum_core::{Codec, ContentEncoding, GzipCodec};
///
/// let compressed = GzipCodec::default().compress(b"hello hello hello").unwrap();
/// let codec = ContentEncoding::from_header("gzip").codec().unwrap();
/// assert_eq!(&codec.decompress(&compressed).unwrap()[..], b"hello hello hello");
/// ```
pub trait Codec: Send + Sync + 'static {
    /// The encoding name for HTTP headers (e.g., "gzip", "deflate").
    fn name(&self) -> &'static str;

    /// Compress data.
    fn compress(&self, data: &[u8]) -> io::Result<Bytes>;

    /// Decompress data.
    fn decompress(&self, data: &[u8]) -> io::Result<Bytes>;
}

/// A boxed codec for type-erased storage.
#[derive(Clone)]
pub struct BoxedCodec(Arc<dyn Codec>);

impl BoxedCodec {
    /// Create a new boxed codec.
    pub fn new<C: Codec>(codec: C) -> Self {
        BoxedCodec(Arc::new(codec))
    }

    /// Get the codec name for HTTP headers.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Compress data.
    pub fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        self.0.compress(data)
    }

    /// Decompress data.
    pub fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        self.0.decompress(data)
    }
}

impl std::fmt::Debug for BoxedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxedCodec").field(&self.name()).finish()
    }
}

/// Gzip codec using flate2.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    /// Compression level (0-9). Default is 6.
    pub level: u32,
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        let mut encoder = GzEncoder::new(Vec::new(), FlateLevel::new(self.level));
        encoder.write_all(data)?;
        Ok(Bytes::from(encoder.finish()?))
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(Bytes::from(decompressed))
    }
}

/// Deflate codec using flate2.
///
/// HTTP "deflate" is specified as the zlib format (RFC 1950), but many clients
/// send raw DEFLATE (RFC 1951). Compression produces zlib; decompression accepts
/// both, telling them apart by the zlib header check bits.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    /// Compression level (0-9). Default is 6.
    pub level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

/// True if `data` starts with a valid zlib header (CM=8, FCHECK ok).
fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => cmf & 0x0f == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        let mut encoder = ZlibEncoder::new(Vec::new(), FlateLevel::new(self.level));
        encoder.write_all(data)?;
        Ok(Bytes::from(encoder.finish()?))
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        let mut decompressed = Vec::new();
        if has_zlib_header(data) {
            ZlibDecoder::new(data).read_to_end(&mut decompressed)?;
        } else {
            DeflateDecoder::new(data).read_to_end(&mut decompressed)?;
        }
        Ok(Bytes::from(decompressed))
    }
}
