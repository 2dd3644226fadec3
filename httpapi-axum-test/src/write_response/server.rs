use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use httpapi_axum::prelude::*;
use serde::Serialize;

#[derive(Serialize)]
struct Row {
    id: u32,
    name: &'static str,
}

/// Enough repetitive rows to be worth compressing.
pub const BIG_ROWS: u32 = 50;

async fn big(head: RequestHead) -> Response {
    let rows: Vec<Row> = (0..BIG_ROWS)
        .map(|id| Row {
            id,
            name: "a row that compresses well",
        })
        .collect();
    write_response(&head, &rows)
}

async fn small(head: RequestHead) -> Response {
    write_response(&head, &Row { id: 1, name: "short" })
}

async fn failed(head: RequestHead) -> Response {
    let result: Result<Row, ApiError> =
        Err(ApiError::public(StatusCode::CONFLICT, "already exists").with_code("DUP"));
    write_result(&head, result)
}

pub async fn start(listener: tokio::net::UnixListener) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/big", get(big))
        .route("/small", get(small))
        .route("/failed", get(failed))
        .layer(ApiLayer::new());

    axum::serve(listener, app).await?;
    Ok(())
}
