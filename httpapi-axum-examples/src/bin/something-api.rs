//! Example: a small JSON Web API
//!
//! This example demonstrates the request/response conventions:
//! - POST decodes a JSON body (gzip-encoded bodies are accepted too)
//! - GET reads typed query parameters and reports all invalid ones at once
//! - Errors are JSON envelopes; loopback clients also see the error detail
//! - The request ID doubles as the trace identifier in error responses
//!
//! Run with: cargo run --bin something-api

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use httpapi_axum::BoxError;
use httpapi_axum::prelude::*;
use serde::{Deserialize, Serialize};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct PostSomethingInput {
    name: String,
    #[serde(default)]
    count: i64,
}

#[derive(Debug)]
struct GetSomethingInput {
    search: String,
    since: Option<DateTime<Utc>>,
    limit: i64,
    offset: i64,
}

#[derive(Debug, Clone, Serialize)]
struct Something {
    id: u64,
    name: String,
    count: i64,
    created: DateTime<Utc>,
}

#[derive(Clone, Default)]
struct Store {
    items: Arc<Mutex<Vec<Something>>>,
}

impl Store {
    fn items(&self) -> Result<MutexGuard<'_, Vec<Something>>, BoxError> {
        self.items
            .lock()
            .map_err(|_| BoxError::from("store lock poisoned"))
    }

    fn insert(&self, input: PostSomethingInput) -> Result<Something, BoxError> {
        if input.name.trim().is_empty() {
            return Err(ApiError::bad_request("name is required")
                .with_code("NAME_REQUIRED")
                .into());
        }
        let mut items = self.items()?;
        let something = Something {
            id: items.len() as u64 + 1,
            name: input.name,
            count: input.count,
            created: Utc::now(),
        };
        items.push(something.clone());
        Ok(something)
    }

    fn find(&self, id: u64) -> Result<Something, BoxError> {
        self.items()?
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("something not found").into())
    }

    fn list(&self, input: &GetSomethingInput) -> Result<Vec<Something>, BoxError> {
        if input.limit < 0 || input.offset < 0 {
            return Err(ApiError::bad_request("limit and offset cannot be negative").into());
        }
        Ok(self
            .items()?
            .iter()
            .filter(|s| s.name.contains(&input.search))
            .filter(|s| input.since.is_none_or(|since| s.created >= since))
            .skip(input.offset as usize)
            .take(input.limit as usize)
            .cloned()
            .collect())
    }
}

/// Handles POST requests
async fn post_something(
    State(store): State<Store>,
    head: RequestHead,
    ApiRequest(input): ApiRequest<PostSomethingInput>,
) -> Response {
    write_result(&head, store.insert(input))
}

/// Extracts the input from the query string
async fn get_something(
    State(store): State<Store>,
    head: RequestHead,
    mut query: Query,
) -> Response {
    let input = GetSomethingInput {
        search: query.get_string("q"),
        since: query.lookup_time("since"),
        limit: query.lookup_int("limit").unwrap_or(20),
        offset: query.get_int("offset"),
    };

    // validate once after all query string parameters have been read
    if let Err(err) = query.err() {
        return write_error(&head, err);
    }

    write_result(&head, store.list(&input))
}

async fn get_one(State(store): State<Store>, head: RequestHead, Path(id): Path<u64>) -> Response {
    write_result(&head, store.find(id))
}

fn request_id(head: &RequestHead) -> Option<String> {
    head.headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,httpapi_axum=debug")),
        )
        .init();

    let errors = ErrorConfig::new().trust(trust_loopback).trace(request_id);

    let app = Router::new()
        .route("/api/something", post(post_something).get(get_something))
        .route("/api/something/{id}", get(get_one))
        .with_state(Store::default())
        .layer(ApiLayer::new().error_config(errors))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr: SocketAddr = "0.0.0.0:8080".parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Example: JSON Web API ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("Test with:");
    println!("  curl -X POST http://localhost:8080/api/something \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"name\": \"widget\", \"count\": 3}}'");
    println!("  curl --compressed 'http://localhost:8080/api/something?q=wid&limit=10'");
    println!("  curl 'http://localhost:8080/api/something?limit=ten&since=yesterday'");
    println!("  curl http://localhost:8080/api/something/42");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
