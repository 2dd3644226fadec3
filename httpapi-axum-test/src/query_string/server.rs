use axum::Router;
use axum::routing::get;
use chrono::{DateTime, NaiveDate, Utc};
use httpapi_axum::prelude::*;
use serde::Serialize;

#[derive(Serialize)]
struct Search {
    q: String,
    limit: i64,
    active: Option<bool>,
    since: Option<DateTime<Utc>>,
    day: Option<NaiveDate>,
}

async fn search(head: RequestHead, mut query: Query) -> Response {
    let input = Search {
        q: query.get_string("q"),
        limit: query.get_int("limit"),
        active: query.lookup_bool("active"),
        since: query.lookup_time("since"),
        day: query.lookup_date("day"),
    };
    if let Err(err) = query.err() {
        return write_error(&head, err);
    }
    write_response(&head, &input)
}

pub async fn start(listener: tokio::net::UnixListener) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/search", get(search))
        .layer(ApiLayer::new());

    axum::serve(listener, app).await?;
    Ok(())
}
