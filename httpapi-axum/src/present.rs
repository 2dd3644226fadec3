//! Error presentation.
//!
//! Turns an arbitrary error into a response that is safe to send to any
//! client. Only what an [`ApiError`] explicitly marks public (status, message,
//! code) is disclosed. Everything else is replaced with a generic 500 unless
//! the client is trusted, in which case the full error is added as detail.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use httpapi_axum_core::{
    ApiError, BoxError, ErrorContent, PublicCode, PublicMessage, PublicStatus, SharedError,
};

use crate::config::ErrorConfig;
use crate::head::RequestHead;

/// Build the content sent to the client for `err`, using the request's config.
pub fn present(head: &RequestHead, err: &SharedError) -> ErrorContent {
    present_with(head, head.config(), err)
}

/// Build the content sent to the client for `err`.
///
/// The error is unwrapped to its root cause through the source chain,
/// stopping at the first [`ApiError`]. The returned content carries the error
/// only if `config` trusts the client.
pub fn present_with(head: &RequestHead, config: &ErrorConfig, err: &SharedError) -> ErrorContent {
    let top: &(dyn StdError + 'static) = &**err;
    let api = root_cause(top).downcast_ref::<ApiError>();

    let status = api
        .and_then(|e| e.public_status())
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = api
        .and_then(|e| e.public_message())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());

    let mut content = ErrorContent::new(status, message);
    content.code = api.and_then(|e| e.public_code()).map(str::to_string);
    content.trace = config.trace_id(head);
    if config.is_trusted(head) {
        content.error = Some(err.clone());
    }
    content
}

/// Follow the source chain to the innermost error, stopping at an `ApiError`.
fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    while !current.is::<ApiError>() {
        match current.source() {
            Some(source) => current = source,
            None => break,
        }
    }
    current
}

/// Write `err` as a JSON error response, using the request's config.
pub fn write_error<E: Into<BoxError>>(head: &RequestHead, err: E) -> Response {
    write_error_with(head, head.config(), err)
}

/// Write `err` as a JSON error response.
///
/// The response carries `Content-Type: application/json`, an exact
/// `Content-Length` and `X-Content-Type-Options: nosniff`. Once it has been
/// built, the config's notifier is called with the content and the full error
/// attached, whether or not the client was trusted.
pub fn write_error_with<E: Into<BoxError>>(
    head: &RequestHead,
    config: &ErrorConfig,
    err: E,
) -> Response {
    let err: SharedError = Arc::from(err.into());
    let mut content = present_with(head, config, &err);
    let body = config.marshal_content(&content);

    let len = body.len();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = content.status();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    content.error = Some(err);
    config.error_written(head, &content);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::fmt;
    use std::net::SocketAddr;
    use std::sync::Mutex;

    fn head() -> RequestHead {
        let req = Request::builder().uri("/x").body(()).unwrap();
        RequestHead::from_request(&req)
    }

    fn shared<E: Into<BoxError>>(err: E) -> SharedError {
        Arc::from(err.into())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Wraps another error without adding anything public.
    #[derive(Debug)]
    struct Context {
        what: &'static str,
        source: BoxError,
    }

    impl fmt::Display for Context {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}: {}", self.what, self.source)
        }
    }

    impl StdError for Context {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&*self.source)
        }
    }

    #[test]
    fn test_public_error() {
        let content = present(&head(), &shared(ApiError::not_found("not found")));
        assert_eq!(content.status(), StatusCode::NOT_FOUND);
        assert_eq!(content.message, "not found");
        assert_eq!(content.code, None);
        assert_eq!(content.trace, None);
        assert!(content.error.is_none());
    }

    #[test]
    fn test_public_code() {
        let err = ApiError::bad_request("bad widget").with_code("W01");
        let content = present(&head(), &shared(err));
        assert_eq!(content.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content.code.as_deref(), Some("W01"));
    }

    #[test]
    fn test_plain_error_is_hidden() {
        let content = present(&head(), &shared(std::io::Error::other("db password wrong")));
        assert_eq!(content.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content.message, "Internal Server Error");
        assert!(content.error.is_none());
    }

    #[test]
    fn test_internal_kind_is_hidden() {
        let err = ApiError::compression(std::io::Error::other("disk"));
        let content = present(&head(), &shared(err));
        assert_eq!(content.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content.message, "Internal Server Error");
    }

    #[test]
    fn test_status_outside_error_range() {
        let err = ApiError::public(StatusCode::FOUND, "moved");
        let content = present(&head(), &shared(err));
        assert_eq!(content.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // the message is still public
        assert_eq!(content.message, "moved");
    }

    #[test]
    fn test_empty_public_message_uses_reason() {
        let err = ApiError::public(StatusCode::CONFLICT, "");
        let content = present(&head(), &shared(err));
        assert_eq!(content.message, "Conflict");
    }

    #[test]
    fn test_cause_is_found_through_wrappers() {
        let err = Context {
            what: "loading user 7",
            source: Box::new(ApiError::not_found("user not found").with_code("U404")),
        };
        let content = present(&head(), &shared(err));
        assert_eq!(content.status(), StatusCode::NOT_FOUND);
        assert_eq!(content.message, "user not found");
        assert_eq!(content.code.as_deref(), Some("U404"));
    }

    #[test]
    fn test_api_error_is_cause_boundary() {
        // the inner public error is detail of the outer internal one
        let err = ApiError::serialization(serde_json::from_str::<u8>("x").unwrap_err())
            .with_source(ApiError::not_found("inner"));
        let content = present(&head(), &shared(err));
        assert_eq!(content.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_trusted_client_gets_error() {
        let config = ErrorConfig::new().trust(|_| true);
        let err = shared(ApiError::not_found("not found"));
        let content = present_with(&head(), &config, &err);
        assert!(content.error.is_some());
    }

    #[test]
    fn test_trace_from_config() {
        let config = ErrorConfig::new().trace(|_| Some("a8845f4dc3792a63".to_string()));
        let content = present_with(&head(), &config, &shared(ApiError::bad_request("no")));
        assert_eq!(content.trace.as_deref(), Some("a8845f4dc3792a63"));
    }

    #[tokio::test]
    async fn test_write_error_untrusted() {
        let response = write_error(&head(), ApiError::not_found("not found"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");

        let len: usize = response.headers()[CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.len(), len);
        assert!(bytes.ends_with(b"\n"));

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": {"message": "not found", "status": 404}})
        );
    }

    #[tokio::test]
    async fn test_write_error_trusted_loopback() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let head = head().with_remote_addr(addr);
        let config = ErrorConfig::new().trust(crate::config::trust_loopback);

        let err = Context {
            what: "saving order",
            source: Box::new(std::io::Error::other("connection reset")),
        };
        let response = write_error_with(&head, &config, err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value = body_json(response).await;
        assert_eq!(value["error"]["message"], "Internal Server Error");
        assert_eq!(value["error"]["detail"], "saving order: connection reset");
    }

    #[tokio::test]
    async fn test_notifier_sees_full_error() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let config = ErrorConfig::new().notify(move |_, content| {
            let detail = content.error.as_ref().map(|e| e.to_string());
            *sink.lock().unwrap() = Some((content.status(), detail));
        });

        let response = write_error_with(&head(), &config, std::io::Error::other("secret"));
        let value = body_json(response).await;
        assert!(value["error"].get("detail").is_none());

        let seen = seen.lock().unwrap().take().unwrap();
        assert_eq!(
            seen,
            (StatusCode::INTERNAL_SERVER_ERROR, Some("secret".to_string()))
        );
    }

    #[tokio::test]
    async fn test_no_information() {
        let response = write_error(&head(), ApiError::no_information());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = body_json(response).await;
        assert_eq!(value["error"]["message"], "no information available");
    }
}
