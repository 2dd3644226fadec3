use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::Request;
use http_body_util::Full;

use super::server::MAX_BYTES;
use crate::CaseResult;
use crate::socket::{TestSocket, error_object, send};

const VALID: &str = r#"{"String":"S","Int":99}"#;

struct TestCase {
    name: &'static str,
    content_encoding: Option<&'static str>,
    body: fn() -> Vec<u8>,
    expected_status: u16,
    expected_message: Option<&'static str>,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "valid JSON",
        content_encoding: None,
        body: || VALID.as_bytes().to_vec(),
        expected_status: 200,
        expected_message: None,
    },
    TestCase {
        name: "truncated JSON",
        content_encoding: None,
        body: || br#"{"String":"S","Int":"#.to_vec(),
        expected_status: 400,
        expected_message: Some("invalid JSON payload"),
    },
    TestCase {
        name: "gzip encoded body",
        content_encoding: Some("gzip"),
        body: || gzip(VALID.as_bytes()),
        expected_status: 200,
        expected_message: None,
    },
    TestCase {
        name: "body at the size limit",
        content_encoding: None,
        body: || vec![b' '; MAX_BYTES],
        expected_status: 413,
        expected_message: Some("payload too large"),
    },
    TestCase {
        name: "unknown content-encoding",
        content_encoding: Some("br"),
        body: || VALID.as_bytes().to_vec(),
        expected_status: 400,
        expected_message: Some("cannot decompress payload"),
    },
    TestCase {
        name: "corrupt gzip body",
        content_encoding: Some("gzip"),
        body: || b"not gzip at all".to_vec(),
        expected_status: 400,
        expected_message: Some("cannot decompress payload"),
    },
];

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // writing to a Vec cannot fail
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

pub async fn run_read_request_tests(sock: &TestSocket) -> Vec<CaseResult> {
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
        .method("POST")
        .uri("/echo")
        .header("Content-Type", "application/json")
        .header("Host", "localhost");
    if let Some(ce) = tc.content_encoding {
        builder = builder.header("Content-Encoding", ce);
    }
    let req = builder.body(Full::new(Bytes::from((tc.body)())))?;

    let (parts, body) = send(sock, req).await?;
    if parts.status.as_u16() != tc.expected_status {
        anyhow::bail!(
            "expected status {}, got {}: {}",
            tc.expected_status,
            parts.status,
            String::from_utf8_lossy(&body)
        );
    }

    match tc.expected_message {
        Some(expected) => {
            let error = error_object(&body)?;
            let message = error.get("message").and_then(|v| v.as_str());
            if message != Some(expected) {
                anyhow::bail!("expected message {expected:?}, got {message:?}");
            }
        }
        None => {
            let got: serde_json::Value = serde_json::from_slice(&body)?;
            let want: serde_json::Value = serde_json::from_str(VALID)?;
            if got != want {
                anyhow::bail!("expected echo of {want}, got {got}");
            }
        }
    }
    Ok(())
}
