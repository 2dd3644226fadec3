use axum::Router;
use axum::routing::post;
use httpapi_axum::prelude::*;
use serde::{Deserialize, Serialize};

/// Largest accepted body is one byte under this.
pub const MAX_BYTES: usize = 1024;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Input {
    string: String,
    int: i64,
}

async fn echo(head: RequestHead, ApiRequest(input): ApiRequest<Input>) -> Response {
    write_response(&head, &input)
}

pub async fn start(listener: tokio::net::UnixListener) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/echo", post(echo))
        .layer(ApiLayer::new().limits(PayloadLimits::new(MAX_BYTES)));

    axum::serve(listener, app).await?;
    Ok(())
}
