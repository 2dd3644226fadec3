use bytes::Bytes;
use http::Request;
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http_body_util::Full;

use super::server::TRUSTED_HEADER;
use crate::CaseResult;
use crate::socket::{TestSocket, error_object, send};

struct TestCase {
    name: &'static str,
    path: &'static str,
    trusted: bool,
    request_id: Option<&'static str>,
    expected_status: u16,
    expected_message: &'static str,
    expected_code: Option<&'static str>,
    expected_detail: Option<&'static str>,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "public error, untrusted client",
        path: "/not-found",
        trusted: false,
        request_id: None,
        expected_status: 404,
        expected_message: "not found",
        expected_code: None,
        expected_detail: None,
    },
    TestCase {
        name: "public error, trusted client",
        path: "/not-found",
        trusted: true,
        request_id: None,
        expected_status: 404,
        expected_message: "not found",
        expected_code: None,
        expected_detail: Some("not found"),
    },
    TestCase {
        name: "internal error, untrusted client",
        path: "/internal",
        trusted: false,
        request_id: None,
        expected_status: 500,
        expected_message: "Internal Server Error",
        expected_code: None,
        expected_detail: None,
    },
    TestCase {
        name: "internal error, trusted client",
        path: "/internal",
        trusted: true,
        request_id: None,
        expected_status: 500,
        expected_message: "Internal Server Error",
        expected_code: None,
        expected_detail: Some("database password rejected"),
    },
    TestCase {
        name: "public code",
        path: "/coded",
        trusted: false,
        request_id: None,
        expected_status: 400,
        expected_message: "bad widget",
        expected_code: Some("W01"),
        expected_detail: None,
    },
    TestCase {
        name: "trace from request id",
        path: "/coded",
        trusted: false,
        request_id: Some("a8845f4dc3792a63"),
        expected_status: 400,
        expected_message: "bad widget",
        expected_code: Some("W01"),
        expected_detail: None,
    },
];

pub async fn run_write_error_tests(sock: &TestSocket) -> Vec<CaseResult> {
    let mut results = Vec::new();
    for tc in TEST_CASES {
        let err = run_one(sock, tc).await.err().map(|e| e.to_string());
        results.push(CaseResult {
            name: tc.name,
            error: err,
        });
    }
    results
}

async fn run_one(sock: &TestSocket, tc: &TestCase) -> anyhow::Result<()> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(tc.path)
        .header("Host", "localhost");
    if tc.trusted {
        builder = builder.header(TRUSTED_HEADER, "yes");
    }
    if let Some(id) = tc.request_id {
        builder = builder.header("x-request-id", id);
    }
    let req = builder.body(Full::new(Bytes::new()))?;

    let (parts, body) = send(sock, req).await?;
    if parts.status.as_u16() != tc.expected_status {
        anyhow::bail!(
            "expected status {}, got {}",
            tc.expected_status,
            parts.status
        );
    }
    if parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) != Some("application/json") {
        anyhow::bail!("expected application/json content type");
    }
    if parts.headers.get(X_CONTENT_TYPE_OPTIONS).and_then(|v| v.to_str().ok()) != Some("nosniff") {
        anyhow::bail!("expected X-Content-Type-Options: nosniff");
    }
    if !body.ends_with(b"}\n") {
        anyhow::bail!("expected indented JSON ending in a newline");
    }

    let error = error_object(&body)?;
    let field = |name: &str| error.get(name).and_then(|v| v.as_str()).map(str::to_string);

    if error.get("status").and_then(|v| v.as_u64()) != Some(u64::from(tc.expected_status)) {
        anyhow::bail!("expected status field {}, got: {error}", tc.expected_status);
    }
    if field("message").as_deref() != Some(tc.expected_message) {
        anyhow::bail!("expected message {:?}, got: {error}", tc.expected_message);
    }
    if field("code").as_deref() != tc.expected_code {
        anyhow::bail!("expected code {:?}, got: {error}", tc.expected_code);
    }
    if field("trace").as_deref() != tc.request_id {
        anyhow::bail!("expected trace {:?}, got: {error}", tc.request_id);
    }
    if field("detail").as_deref() != tc.expected_detail {
        anyhow::bail!("expected detail {:?}, got: {error}", tc.expected_detail);
    }
    Ok(())
}
