//! Writing values as JSON responses.

use axum::body::Body;
use axum::response::Response;
use httpapi_axum_core::{ApiError, BoxError, Payload};
use serde::Serialize;

use crate::head::RequestHead;
use crate::present::write_error;

/// Send `value` to the client as JSON.
///
/// The body is gzipped when the client's Accept-Encoding allows it and doing
/// so makes it meaningfully smaller. A value that cannot be encoded is reported
/// through [`write_error`] instead, so this never fails.
pub fn write_response<T>(head: &RequestHead, value: &T) -> Response
where
    T: Serialize + ?Sized,
{
    match encode(head, value) {
        Ok(response) => response,
        Err(err) => write_error(head, err),
    }
}

/// Send the value of `result` as JSON, or its error as an error response.
pub fn write_result<T, E>(head: &RequestHead, result: Result<T, E>) -> Response
where
    T: Serialize,
    E: Into<BoxError>,
{
    match result {
        Ok(value) => write_response(head, &value),
        Err(err) => write_error(head, err),
    }
}

fn encode<T>(head: &RequestHead, value: &T) -> Result<Response, ApiError>
where
    T: Serialize + ?Sized,
{
    let mut payload = Payload::from_json(value)?;
    payload.compress_response(head.accept_encoding())?;
    Ok(payload.into_response()?.map(Body::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use httpapi_axum_core::{Codec, GzipCodec};
    use serde::ser::Error as _;
    use std::collections::BTreeMap;

    fn head(accept_encoding: Option<&str>) -> RequestHead {
        let mut builder = Request::builder().uri("/x");
        if let Some(value) = accept_encoding {
            builder = builder.header("accept-encoding", value);
        }
        RequestHead::from_request(&builder.body(()).unwrap())
    }

    fn big_map() -> BTreeMap<String, String> {
        (0..20)
            .map(|i| (format!("key{i}"), "some repetitive value".to_string()))
            .collect()
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot encode"))
        }
    }

    #[tokio::test]
    async fn test_write_response_plain() {
        let response = write_response(&head(None), &serde_json::json!({"id": 1}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[CONTENT_LENGTH], "8");
        assert!(response.headers().get(CONTENT_ENCODING).is_none());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_write_response_gzip() {
        let value = big_map();
        let response = write_response(&head(Some("gzip, deflate, br")), &value);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let plain = GzipCodec::default().decompress(&bytes).unwrap();
        let decoded: BTreeMap<String, String> = serde_json::from_slice(&plain).unwrap();
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn test_write_response_not_accepted() {
        let response = write_response(&head(Some("br")), &big_map());
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_write_response_encode_failure() {
        let response = write_response(&head(None), &Unencodable);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"]["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_write_result() {
        let ok: Result<u32, ApiError> = Ok(7);
        let response = write_result(&head(None), ok);
        assert_eq!(response.status(), StatusCode::OK);

        let err: Result<u32, ApiError> = Err(ApiError::bad_request("no good"));
        let response = write_result(&head(None), err);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_write_response_empty_string() {
        // "" encodes to two bytes, so only a truly empty payload is 204
        let response = write_response(&head(None), "");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "2");
    }
}
