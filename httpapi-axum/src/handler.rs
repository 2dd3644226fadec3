//! Handlers that return errors.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use httpapi_axum_core::BoxError;
use tower::Service;

use crate::head::RequestHead;
use crate::present::write_error;

/// Wrap an async function returning `Result<Response, E>` as a service.
///
/// An `Err` is written to the client with [`write_error`], using the
/// configuration of the request that produced it.
///
/// # Example
///
/// ```rust,ignore
/// async fn delete_thing(req: Request) -> Result<Response, ApiError> {
///     let head = RequestHead::from_request(&req);
///     let input: DeleteThing = read_request(req).await?;
///     things::delete(input.id).await?;
///     Ok(write_response(&head, &()))
/// }
///
/// let app = Router::new().route_service("/api/things/delete", handler_fn(delete_thing));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

/// Service returned by [`handler_fn`].
#[derive(Clone, Copy, Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut, E> Service<Request> for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: Into<BoxError>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let head = RequestHead::from_request(&req);
        let fut = (self.f)(req);
        Box::pin(async move {
            Ok(match fut.await {
                Ok(response) => response,
                Err(err) => write_error(&head, err),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::read_request;
    use crate::response::write_response;
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use httpapi_axum_core::ApiError;
    use tower::ServiceExt;

    async fn double(req: Request) -> Result<Response, ApiError> {
        let head = RequestHead::from_request(&req);
        let n: i64 = read_request(req).await?;
        if n < 0 {
            return Err(ApiError::bad_request("negative"));
        }
        Ok(write_response(&head, &(n * 2)))
    }

    fn app() -> Router {
        Router::new().route_service("/double", handler_fn(double))
    }

    #[tokio::test]
    async fn test_handler_ok() {
        let req = Request::builder()
            .method("POST")
            .uri("/double")
            .body(Body::from("21"))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_is_written() {
        let req = Request::builder()
            .method("POST")
            .uri("/double")
            .body(Body::from("-1"))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    }

    /// Not `Clone`, so a closure capturing it is not either.
    struct Greeting(String);

    #[tokio::test]
    async fn test_handler_without_clone() {
        let greeting = Greeting("hello".to_string());
        let svc = handler_fn(move |req: Request| {
            let text = format!("{} {}", greeting.0, req.uri().path());
            async move { Ok::<_, ApiError>(text.into_response()) }
        });

        let req = Request::builder()
            .uri("/world")
            .body(Body::empty())
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = http_body_util::BodyExt::collect(resp.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&bytes[..], b"hello /world");
    }

    #[tokio::test]
    async fn test_handler_read_error_is_written() {
        let req = Request::builder()
            .method("POST")
            .uri("/double")
            .header("content-length", "nope")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
