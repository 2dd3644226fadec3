//! Error envelope sent to clients.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

/// Shared handle to the error being reported.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Information sent back to the client in an error response.
///
/// `error` is only set while marshalling when the client is trusted. It is
/// always set by the time the post-write notifier sees the content.
#[derive(Clone, Debug)]
pub struct ErrorContent {
    /// Message sent to the client, which may differ from the error's Display.
    pub message: String,
    status: StatusCode,
    /// Optional error code.
    pub code: Option<String>,
    /// Optional identifier for cross reference with logs or traces.
    pub trace: Option<String>,
    /// The error itself; sent as detail to trusted clients only.
    pub error: Option<SharedError>,
}

impl ErrorContent {
    /// Create content with a status and message.
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        let mut content = Self {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: None,
            trace: None,
            error: None,
        };
        content.set_status(status);
        content
    }

    /// Get the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the HTTP status. Anything outside 100..=599 becomes 500.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = if (100..=599).contains(&status.as_u16()) {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    status: u16,
    #[serde(skip_serializing_if = "str::is_empty")]
    code: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    trace: &'a str,
    #[serde(skip_serializing_if = "String::is_empty")]
    detail: String,
}

/// Marshal content into the default JSON shape.
///
/// ```json
/// {
///   "error": {
///     "message": "message text",
///     "status": 400,
///     "code": "XXX999",
///     "trace": "a8845f4dc3792a63",
///     "detail": "detailed information for trusted clients"
///   }
/// }
/// ```
///
/// `code`, `trace` and `detail` are omitted when empty. The output is indented
/// for reading with curl and ends with a newline. `<`, `>`, `&`, U+2028 and
/// U+2029 are written as `\u` escapes so the body is safe to embed in HTML.
pub fn marshal_content(content: &ErrorContent) -> Bytes {
    let envelope = ErrorEnvelope {
        error: ErrorBody {
            message: &content.message,
            status: content.status.as_u16(),
            code: content.code.as_deref().unwrap_or_default(),
            trace: content.trace.as_deref().unwrap_or_default(),
            detail: content
                .error
                .as_ref()
                .map(|err| err.to_string())
                .unwrap_or_default(),
        },
    };

    // Serializing strings and integers cannot fail.
    let buf = serde_json::to_vec_pretty(&envelope).unwrap_or_default();
    let mut buf = escape_html(&buf);
    buf.push(b'\n');
    Bytes::from(buf)
}

/// Escape HTML-significant characters in JSON text.
///
/// None of them can occur outside a string in JSON, so every occurrence is
/// inside a string value where a `\u` escape means the same thing.
fn escape_html(json: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(json.len());
    let mut i = 0;
    while i < json.len() {
        match json[i..] {
            [b'<', ..] => out.extend_from_slice(b"\\u003c"),
            [b'>', ..] => out.extend_from_slice(b"\\u003e"),
            [b'&', ..] => out.extend_from_slice(b"\\u0026"),
            // U+2028 and U+2029 in UTF-8
            [0xe2, 0x80, 0xa8, ..] => {
                out.extend_from_slice(b"\\u2028");
                i += 2;
            }
            [0xe2, 0x80, 0xa9, ..] => {
                out.extend_from_slice(b"\\u2029");
                i += 2;
            }
            [b, ..] => out.push(b),
            [] => break,
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_out_of_range() {
        let status = StatusCode::from_u16(799).unwrap();
        let content = ErrorContent::new(status, "odd");
        assert_eq!(content.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let content = ErrorContent::new(StatusCode::NOT_FOUND, "missing");
        assert_eq!(content.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_marshal_minimal() {
        let content = ErrorContent::new(StatusCode::NOT_FOUND, "not found");
        let bytes = marshal_content(&content);
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "{\n  \"error\": {\n    \"message\": \"not found\",\n    \"status\": 404\n  }\n}\n"
        );
    }

    #[test]
    fn test_marshal_all_fields() {
        let mut content = ErrorContent::new(StatusCode::BAD_REQUEST, "bad input");
        content.code = Some("E42".to_string());
        content.trace = Some("a8845f4dc3792a63".to_string());
        content.error = Some(Arc::new(std::io::Error::other("boom")));

        let value: serde_json::Value = serde_json::from_slice(&marshal_content(&content)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "error": {
                    "message": "bad input",
                    "status": 400,
                    "code": "E42",
                    "trace": "a8845f4dc3792a63",
                    "detail": "boom",
                }
            })
        );
    }

    #[test]
    fn test_marshal_escapes_html() {
        let content = ErrorContent::new(
            StatusCode::BAD_REQUEST,
            "invalid value(s) in query string: <a>&b\u{2028}",
        );
        let bytes = marshal_content(&content);
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains(
            r#""message": "invalid value(s) in query string: \u003ca\u003e\u0026b\u2028""#
        ));

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value["error"]["message"],
            "invalid value(s) in query string: <a>&b\u{2028}"
        );
    }

    #[test]
    fn test_marshal_omits_empty_code_and_trace() {
        let mut content = ErrorContent::new(StatusCode::BAD_REQUEST, "bad input");
        content.code = Some(String::new());
        content.trace = Some(String::new());

        let value: serde_json::Value = serde_json::from_slice(&marshal_content(&content)).unwrap();
        let error = value.get("error").unwrap();
        assert!(error.get("code").is_none());
        assert!(error.get("trace").is_none());
        assert!(error.get("detail").is_none());
    }
}
