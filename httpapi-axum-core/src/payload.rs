//! Request and response body buffer.
//!
//! A [`Payload`] owns the bytes of one body together with its content type and
//! content encoding. Request bodies are received into a payload, decompressed
//! and decoded from JSON; response values are encoded into a payload,
//! compressed when the client accepts it and turned into an HTTP response.

use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{Codec, GzipCodec};
use crate::compression::{ContentEncoding, ENCODING_OVERHEAD, MIN_COMPRESS_BYTES, accepts_gzip};
use crate::error::ApiError;

/// Content type used when a request does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type of marshalled payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// The content of one request or response body.
#[derive(Clone, Debug, Default)]
pub struct Payload {
    content: Bytes,
    content_type: String,
    encoding: ContentEncoding,
    /// Zero when unknown.
    uncompressed_len: usize,
}

impl Payload {
    /// Create an uncompressed payload.
    pub fn new<B: Into<Bytes>, S: Into<String>>(content: B, content_type: S) -> Self {
        let content = content.into();
        Self {
            uncompressed_len: content.len(),
            content,
            content_type: content_type.into(),
            encoding: ContentEncoding::Identity,
        }
    }

    /// Create a payload from a body read off the wire and its request headers.
    ///
    /// A declared Content-Encoding is trusted verbatim, in which case the
    /// uncompressed length is unknown until [`decompress`](Self::decompress).
    pub fn received(content: Bytes, headers: &HeaderMap) -> Self {
        let declared = headers
            .get(CONTENT_ENCODING)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .filter(|v| !v.is_empty());

        let (encoding, uncompressed_len) = match declared {
            Some(value) => (ContentEncoding::from_header(&value), 0),
            None => (ContentEncoding::Identity, content.len()),
        };

        let content_type = headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Self {
            content,
            content_type,
            encoding,
            uncompressed_len,
        }
    }

    /// Create a payload holding `value` encoded as JSON.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        let mut payload = Self::default();
        payload.marshal_from(value)?;
        Ok(payload)
    }

    /// Get the content bytes.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Get the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the content encoding.
    pub fn encoding(&self) -> &ContentEncoding {
        &self.encoding
    }

    /// Length of the content once decompressed, or 0 if unknown.
    pub fn uncompressed_len(&self) -> usize {
        self.uncompressed_len
    }

    /// Length of the content as held.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns whether the content is compressed.
    pub fn is_compressed(&self) -> bool {
        !self.encoding.is_identity()
    }

    /// Decompress the content in place.
    ///
    /// Does nothing if the content is not compressed. Fails with
    /// `UnsupportedEncoding` for encodings other than gzip and deflate.
    pub fn decompress(&mut self) -> Result<(), ApiError> {
        if !self.is_compressed() {
            return Ok(());
        }
        let codec = self
            .encoding
            .codec()
            .ok_or_else(|| ApiError::unsupported_encoding(self.encoding.as_str()))?;

        let decompressed = codec
            .decompress(&self.content)
            .map_err(ApiError::decompression)?;

        tracing::trace!(
            encoding = codec.name(),
            compressed = self.content.len(),
            decompressed = decompressed.len(),
            "decompressed payload"
        );

        self.uncompressed_len = decompressed.len();
        self.content = decompressed;
        self.encoding = ContentEncoding::Identity;
        Ok(())
    }

    /// Gzip the content if the client accepts it and it is worth doing.
    ///
    /// Already compressed or short content is left alone, as is content the
    /// client's Accept-Encoding does not mention gzip for. The compressed form
    /// is only kept if it saves more than the extra header costs.
    pub fn compress_response(&mut self, accept_encoding: Option<&str>) -> Result<(), ApiError> {
        if self.is_compressed() || self.content.len() < MIN_COMPRESS_BYTES {
            return Ok(());
        }
        if !accepts_gzip(accept_encoding) {
            return Ok(());
        }

        let compressed = GzipCodec::default()
            .compress(&self.content)
            .map_err(ApiError::compression)?;

        if compressed.len() + ENCODING_OVERHEAD < self.content.len() {
            tracing::trace!(
                original = self.content.len(),
                compressed = compressed.len(),
                "compressed response payload"
            );
            self.uncompressed_len = self.content.len();
            self.content = compressed;
            self.encoding = ContentEncoding::Gzip;
        }
        Ok(())
    }

    /// Decompress and decode the content as JSON.
    pub fn unmarshal_to<T: DeserializeOwned>(&mut self) -> Result<T, ApiError> {
        self.decompress().map_err(|err| {
            ApiError::bad_request("cannot decompress payload").with_source(err)
        })?;
        serde_json::from_slice(&self.content)
            .map_err(|err| ApiError::bad_request("invalid JSON payload").with_source(err))
    }

    /// Replace the content with `value` encoded as JSON.
    pub fn marshal_from<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ApiError> {
        let bytes = serde_json::to_vec(value).map_err(ApiError::serialization)?;
        self.uncompressed_len = bytes.len();
        self.content = Bytes::from(bytes);
        self.content_type = JSON_CONTENT_TYPE.to_string();
        self.encoding = ContentEncoding::Identity;
        Ok(())
    }

    /// Build the HTTP response carrying this payload.
    ///
    /// Empty content becomes `204 No Content` without type or encoding headers.
    pub fn into_response(self) -> Result<Response<Bytes>, ApiError> {
        if self.content.is_empty() {
            return Response::builder()
                .status(StatusCode::NO_CONTENT)
                .header(CONTENT_LENGTH, HeaderValue::from_static("0"))
                .body(Bytes::new())
                .map_err(ApiError::io);
        }

        let content_type = HeaderValue::from_str(&self.content_type).map_err(ApiError::io)?;
        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, HeaderValue::from(self.content.len()));

        if self.is_compressed() {
            let encoding = HeaderValue::from_str(self.encoding.as_str()).map_err(ApiError::io)?;
            builder = builder.header(CONTENT_ENCODING, encoding);
        }

        builder.body(self.content).map_err(ApiError::io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
        count: i64,
    }

    fn long_json() -> Item {
        Item {
            name: "abcdefghij".repeat(30),
            count: 7,
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_received_defaults() {
        let payload = Payload::received(Bytes::from_static(b"abc"), &HeaderMap::new());
        assert_eq!(payload.content_type(), DEFAULT_CONTENT_TYPE);
        assert_eq!(payload.encoding(), &ContentEncoding::Identity);
        assert_eq!(payload.uncompressed_len(), 3);
        assert!(!payload.is_compressed());
    }

    #[test]
    fn test_received_declared_encoding() {
        let payload = Payload::received(
            Bytes::from_static(b"abc"),
            &headers(&[("content-encoding", "gzip"), ("content-type", "text/plain")]),
        );
        assert_eq!(payload.content_type(), "text/plain");
        assert_eq!(payload.encoding(), &ContentEncoding::Gzip);
        assert_eq!(payload.uncompressed_len(), 0);
        assert!(payload.is_compressed());
    }

    #[test]
    fn test_marshal_unmarshal() {
        let item = long_json();
        let mut payload = Payload::from_json(&item).unwrap();
        assert_eq!(payload.content_type(), JSON_CONTENT_TYPE);
        assert_eq!(payload.uncompressed_len(), payload.len());

        let decoded: Item = payload.unmarshal_to().unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_unmarshal_invalid_json() {
        let mut payload = Payload::new(&b"{\"name\":"[..], JSON_CONTENT_TYPE);
        let err = payload.unmarshal_to::<Item>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "invalid JSON payload");
    }

    #[test]
    fn test_unmarshal_unknown_encoding() {
        let mut payload = Payload::received(
            Bytes::from_static(b"{}"),
            &headers(&[("content-encoding", "br")]),
        );
        let err = payload.unmarshal_to::<serde_json::Value>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "cannot decompress payload");
    }

    #[test]
    fn test_decompress_unknown_encoding() {
        let mut payload = Payload::received(
            Bytes::from_static(b"{}"),
            &headers(&[("content-encoding", "br")]),
        );
        let err = payload.decompress().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
    }

    #[test]
    fn test_decompress_corrupt_gzip() {
        let mut payload = Payload::received(
            Bytes::from_static(b"definitely not gzip"),
            &headers(&[("content-encoding", "gzip")]),
        );
        let err = payload.decompress().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decompression);
    }

    #[test]
    fn test_gzip_request_roundtrip() {
        let item = long_json();
        let raw = serde_json::to_vec(&item).unwrap();
        let gz = GzipCodec::default().compress(&raw).unwrap();

        let mut payload = Payload::received(gz, &headers(&[("content-encoding", "gzip")]));
        let decoded: Item = payload.unmarshal_to().unwrap();
        assert_eq!(decoded, item);
        assert_eq!(payload.uncompressed_len(), raw.len());
        assert!(!payload.is_compressed());
    }

    #[test]
    fn test_compress_response() {
        let mut payload = Payload::from_json(&long_json()).unwrap();
        let original = payload.len();
        payload.compress_response(Some("gzip, deflate")).unwrap();

        assert_eq!(payload.encoding(), &ContentEncoding::Gzip);
        assert!(payload.len() + ENCODING_OVERHEAD < original);
        assert_eq!(payload.uncompressed_len(), original);
    }

    #[test]
    fn test_compress_response_skips() {
        // client does not accept gzip
        let mut payload = Payload::from_json(&long_json()).unwrap();
        payload.compress_response(Some("deflate")).unwrap();
        assert!(!payload.is_compressed());
        payload.compress_response(None).unwrap();
        assert!(!payload.is_compressed());

        // too short to bother
        let mut payload = Payload::new(vec![b'a'; MIN_COMPRESS_BYTES - 1], "text/plain");
        payload.compress_response(Some("gzip")).unwrap();
        assert!(!payload.is_compressed());
    }

    #[test]
    fn test_compress_response_not_twice() {
        let mut payload = Payload::from_json(&long_json()).unwrap();
        payload.compress_response(Some("gzip")).unwrap();
        let once = payload.content().clone();
        payload.compress_response(Some("gzip")).unwrap();
        assert_eq!(payload.content(), &once);
    }

    #[test]
    fn test_compress_response_keeps_incompressible() {
        // pseudo-random bytes do not shrink by more than the header overhead
        let mut state: u32 = 0x1234_5678;
        let noise: Vec<u8> = (0..512)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        let mut payload = Payload::new(noise.clone(), "application/octet-stream");
        payload.compress_response(Some("gzip")).unwrap();
        assert!(!payload.is_compressed());
        assert_eq!(&payload.content()[..], &noise[..]);
    }

    #[test]
    fn test_into_response_empty() {
        let response = Payload::new(Bytes::new(), "application/json")
            .into_response()
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[CONTENT_LENGTH], "0");
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
    }

    #[test]
    fn test_into_response_compressed() {
        let mut payload = Payload::from_json(&long_json()).unwrap();
        payload.compress_response(Some("gzip")).unwrap();
        let len = payload.len();

        let response = payload.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(response.headers()[CONTENT_LENGTH], len.to_string().as_str());
        assert_eq!(response.body().len(), len);
    }

    #[test]
    fn test_into_response_invalid_content_type() {
        let err = Payload::new(&b"x"[..], "bad\ncontent-type")
            .into_response()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
