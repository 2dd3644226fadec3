use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use http::Request;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use http_body_util::Full;

use super::server::BIG_ROWS;
use crate::CaseResult;
use crate::socket::{TestSocket, error_object, send};

enum Expect {
    /// JSON array of this many rows, gzipped or not.
    Rows { len: usize, gzipped: bool },
    /// Single JSON object, never gzipped.
    Object,
    /// Error envelope with status, message and code.
    Error {
        status: u16,
        message: &'static str,
        code: &'static str,
    },
}

struct TestCase {
    name: &'static str,
    path: &'static str,
    accept_encoding: Option<&'static str>,
    expect: Expect,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "large response, gzip accepted",
        path: "/big",
        accept_encoding: Some("gzip, deflate"),
        expect: Expect::Rows {
            len: BIG_ROWS as usize,
            gzipped: true,
        },
    },
    TestCase {
        name: "large response, no Accept-Encoding",
        path: "/big",
        accept_encoding: None,
        expect: Expect::Rows {
            len: BIG_ROWS as usize,
            gzipped: false,
        },
    },
    TestCase {
        name: "large response, gzip not offered",
        path: "/big",
        accept_encoding: Some("br"),
        expect: Expect::Rows {
            len: BIG_ROWS as usize,
            gzipped: false,
        },
    },
    TestCase {
        name: "small response is not compressed",
        path: "/small",
        accept_encoding: Some("gzip"),
        expect: Expect::Object,
    },
    TestCase {
        name: "error result is written as error",
        path: "/failed",
        accept_encoding: Some("gzip"),
        expect: Expect::Error {
            status: 409,
            message: "already exists",
            code: "DUP",
        },
    },
];

pub async fn run_write_response_tests(sock: &TestSocket) -> Vec<CaseResult> {
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
    if let Some(ae) = tc.accept_encoding {
        builder = builder.header("Accept-Encoding", ae);
    }
    let req = builder.body(Full::new(Bytes::new()))?;

    let (parts, body) = send(sock, req).await?;

    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared != Some(body.len()) {
        anyhow::bail!("content-length {declared:?} does not match body of {}", body.len());
    }
    let encoding = parts.headers.get(CONTENT_ENCODING).and_then(|v| v.to_str().ok());

    match &tc.expect {
        Expect::Rows { len, gzipped } => {
            if parts.status != 200 {
                anyhow::bail!("expected status 200, got {}", parts.status);
            }
            let plain = match (gzipped, encoding) {
                (true, Some("gzip")) => {
                    let mut plain = Vec::new();
                    GzDecoder::new(&body[..]).read_to_end(&mut plain)?;
                    plain
                }
                (false, None) => body.to_vec(),
                (_, other) => anyhow::bail!("unexpected content-encoding {other:?}"),
            };
            let rows: Vec<serde_json::Value> = serde_json::from_slice(&plain)?;
            if rows.len() != *len {
                anyhow::bail!("expected {len} rows, got {}", rows.len());
            }
        }
        Expect::Object => {
            if parts.status != 200 {
                anyhow::bail!("expected status 200, got {}", parts.status);
            }
            if encoding.is_some() {
                anyhow::bail!("unexpected content-encoding {encoding:?}");
            }
            let _: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&body)?;
        }
        Expect::Error {
            status,
            message,
            code,
        } => {
            if parts.status.as_u16() != *status {
                anyhow::bail!("expected status {status}, got {}", parts.status);
            }
            let error = error_object(&body)?;
            if error.get("message").and_then(|v| v.as_str()) != Some(*message) {
                anyhow::bail!("expected message {message:?}, got: {error}");
            }
            if error.get("code").and_then(|v| v.as_str()) != Some(*code) {
                anyhow::bail!("expected code {code:?}, got: {error}");
            }
        }
    }
    Ok(())
}
