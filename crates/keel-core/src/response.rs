//! The response contract produced by the dispatch core.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use http_body_util::Full;

/// The HTTP response type produced by handlers, middleware and the kernel.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Content type used for HTML responses.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Content type used for JSON responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type used for plain text responses.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a `200 OK` HTML response.
    fn html(body: impl Into<String>) -> Response;

    /// Creates a `200 OK` JSON response from an already-serialized value.
    fn json(value: &serde_json::Value) -> Response;

    /// Creates a plain text response with the given status.
    fn text(status: StatusCode, body: impl Into<String>) -> Response;

    /// Creates an error response with the given status code and message.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON error response.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn html(body: impl Into<String>) -> Response {
        build(StatusCode::OK, HTML_CONTENT_TYPE, Bytes::from(body.into()))
    }

    fn json(value: &serde_json::Value) -> Response {
        build(StatusCode::OK, JSON_CONTENT_TYPE, Bytes::from(value.to_string()))
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Response {
        build(status, TEXT_CONTENT_TYPE, Bytes::from(body.into()))
    }

    fn error(status: StatusCode, message: &str) -> Response {
        build(status, TEXT_CONTENT_TYPE, Bytes::from(message.to_string()))
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });

        build(status, JSON_CONTENT_TYPE, Bytes::from(body.to_string()))
    }
}

fn build(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_response() {
        let response = Response::html("<h1>hi</h1>");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            HTML_CONTENT_TYPE
        );
    }

    #[test]
    fn test_error_response() {
        let response = Response::error(StatusCode::BAD_REQUEST, "Invalid input");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            TEXT_CONTENT_TYPE
        );
    }

    #[test]
    fn test_json_error_response() {
        let response = Response::json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Nothing here");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            JSON_CONTENT_TYPE
        );
    }
}
