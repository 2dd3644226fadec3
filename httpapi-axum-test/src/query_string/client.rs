use bytes::Bytes;
use http::Request;
use http_body_util::Full;

use crate::CaseResult;
use crate::socket::{TestSocket, error_object, send};

struct TestCase {
    name: &'static str,
    query: &'static str,
    expected_status: u16,
    /// Whole response body for 200, or the error message otherwise.
    expected: &'static str,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "repeated names use the first value",
        query: "active=1&active=0&limit=1&limit=2",
        expected_status: 200,
        expected: r#"{"q":"","limit":1,"active":true,"since":null,"day":null}"#,
    },
    TestCase {
        name: "typed values",
        query: "q=hello%20world&active=No&since=2020-01-02T03:04:05%2B10:00&day=2021-02-28",
        expected_status: 200,
        expected: r#"{"q":"hello world","limit":0,"active":false,"since":"2020-01-01T17:04:05Z","day":"2021-02-28"}"#,
    },
    TestCase {
        name: "null and blank times are absent",
        query: "since=null&day=%20&q=",
        expected_status: 200,
        expected: r#"{"q":"","limit":0,"active":null,"since":null,"day":null}"#,
    },
    TestCase {
        name: "invalid values are reported together",
        query: "limit=ten&since=yesterday&active=maybe&day=2021-02-30",
        expected_status: 400,
        expected: "invalid value(s) in query string: active,day,limit,since",
    },
];

pub async fn run_query_string_tests(sock: &TestSocket) -> Vec<CaseResult> {
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
    let req = Request::builder()
        .method("GET")
        .uri(format!("/search?{}", tc.query))
        .header("Host", "localhost")
        .body(Full::new(Bytes::new()))?;

    let (parts, body) = send(sock, req).await?;
    if parts.status.as_u16() != tc.expected_status {
        anyhow::bail!(
            "expected status {}, got {}: {}",
            tc.expected_status,
            parts.status,
            String::from_utf8_lossy(&body)
        );
    }

    if parts.status.is_success() {
        let got: serde_json::Value = serde_json::from_slice(&body)?;
        let want: serde_json::Value = serde_json::from_str(tc.expected)?;
        if got != want {
            anyhow::bail!("expected {want}, got {got}");
        }
    } else {
        let error = error_object(&body)?;
        let message = error.get("message").and_then(|v| v.as_str());
        if message != Some(tc.expected) {
            anyhow::bail!("expected message {:?}, got {message:?}", tc.expected);
        }
    }
    Ok(())
}
