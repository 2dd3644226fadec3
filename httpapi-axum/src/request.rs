//! Reading request bodies.
//!
//! Bodies are read into memory in full before they are decoded. A declared
//! `Content-Length` is checked against the limit before anything is read; a
//! body without one is read until it ends or reaches the limit.

use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_LENGTH;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use httpapi_axum_core::{ApiError, Payload, PayloadError};
use serde::de::DeserializeOwned;

use crate::head::{RequestHead, config_or_default};
use crate::limits::PayloadLimits;
use crate::present::write_error;

/// Read the request body into a [`Payload`], using the limits attached by
/// [`ApiLayer`](crate::ApiLayer).
pub async fn read_payload(req: Request) -> Result<Payload, ApiError> {
    let (_, limits) = config_or_default(req.extensions());
    read_payload_with(req, limits).await
}

/// Read the request body into a [`Payload`].
///
/// Fails with `400 Bad Request` for a malformed Content-Length or a body that
/// cannot be read in full, and with `413 Payload Too Large` for a body that
/// reaches `limits`.
pub async fn read_payload_with(req: Request, limits: PayloadLimits) -> Result<Payload, ApiError> {
    let (parts, body) = req.into_parts();
    let content = match declared_length(&parts.headers, limits)? {
        Some(len) => read_declared(body, len).await?,
        None => read_to_limit(body, limits).await?,
    };
    Ok(Payload::received(content, &parts.headers))
}

/// Read the request body as JSON into a `T`.
///
/// A body declaring `Content-Encoding: gzip` or `deflate` is decompressed
/// first.
pub async fn read_request<T: DeserializeOwned>(req: Request) -> Result<T, ApiError> {
    read_payload(req).await?.unmarshal_to()
}

/// Parse Content-Length. An empty header counts as absent.
fn declared_length(headers: &HeaderMap, limits: PayloadLimits) -> Result<Option<usize>, ApiError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(value.as_bytes());
    if text.is_empty() {
        return Ok(None);
    }

    let declared: u64 = text.parse().map_err(|_| {
        ApiError::bad_request("invalid content-length")
            .with_source(PayloadError::InvalidContentLength(text.to_string()))
    })?;

    if limits.exceeded_by(declared) {
        return Err(ApiError::payload_too_large("payload too large").with_source(
            PayloadError::DeclaredTooLarge {
                declared,
                max: limits.max_bytes(),
            },
        ));
    }

    // below the limit, so it fits
    Ok(Some(declared as usize))
}

/// Read exactly `len` bytes.
async fn read_declared(mut body: Body, len: usize) -> Result<Bytes, ApiError> {
    let mut buf = BytesMut::with_capacity(len);

    while buf.len() < len {
        let frame = match body.frame().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                return Err(ApiError::bad_request("cannot read full content")
                    .with_source(PayloadError::Stream(err.into())));
            }
            None => break,
        };
        if let Ok(data) = frame.into_data() {
            let take = data.len().min(len - buf.len());
            buf.extend_from_slice(&data[..take]);
        }
    }

    if buf.len() < len {
        return Err(
            ApiError::bad_request("cannot read full content").with_source(PayloadError::ShortRead {
                read: buf.len(),
                declared: len,
            }),
        );
    }
    Ok(buf.freeze())
}

/// Read until the body ends or the limit is reached.
async fn read_to_limit(mut body: Body, limits: PayloadLimits) -> Result<Bytes, ApiError> {
    let max = limits.max_bytes();
    let mut buf = BytesMut::new();

    while buf.len() < max {
        let frame = match body.frame().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                return Err(ApiError::bad_request("cannot read all content")
                    .with_source(PayloadError::Stream(err.into())));
            }
            None => break,
        };
        if let Ok(data) = frame.into_data() {
            let take = data.len().min(max - buf.len());
            buf.extend_from_slice(&data[..take]);
        }
    }

    if buf.len() >= max {
        return Err(ApiError::payload_too_large("payload too large")
            .with_source(PayloadError::LimitReached { max }));
    }
    Ok(buf.freeze())
}

/// Extractor that reads the request body as JSON.
///
/// When the body cannot be read or decoded, the rejection is the error
/// response produced by [`write_error`].
///
/// # Example
///
/// ```rust,ignore
/// async fn create(head: RequestHead, ApiRequest(input): ApiRequest<CreateThing>) -> Response {
///     write_result(&head, things::create(input).await)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest<T>(pub T);

impl<S, T> FromRequest<S> for ApiRequest<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let head = RequestHead::from_request(&req);
        match read_payload_with(req, head.limits())
            .await
            .and_then(|mut payload| payload.unmarshal_to())
        {
            Ok(value) => Ok(ApiRequest(value)),
            Err(err) => Err(write_error(&head, err)),
        }
    }
}
