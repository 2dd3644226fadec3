use axum::Router;
use axum::routing::get;
use httpapi_axum::prelude::*;

/// Requests carrying this header are trusted with error detail.
pub const TRUSTED_HEADER: &str = "x-trusted";

async fn not_found(head: RequestHead) -> Response {
    write_error(&head, ApiError::not_found("not found"))
}

async fn internal(head: RequestHead) -> Response {
    write_error(&head, std::io::Error::other("database password rejected"))
}

async fn coded(head: RequestHead) -> Response {
    write_error(&head, ApiError::bad_request("bad widget").with_code("W01"))
}

fn request_id(head: &RequestHead) -> Option<String> {
    head.headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn start(listener: tokio::net::UnixListener) -> anyhow::Result<()> {
    let errors = ErrorConfig::new()
        .trust(|head| head.headers().contains_key(TRUSTED_HEADER))
        .trace(request_id);

    let app = Router::new()
        .route("/not-found", get(not_found))
        .route("/internal", get(internal))
        .route("/coded", get(coded))
        .layer(ApiLayer::new().error_config(errors));

    axum::serve(listener, app).await?;
    Ok(())
}
