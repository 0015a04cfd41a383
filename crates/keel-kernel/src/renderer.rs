//! Exception rendering.
//!
//! Every failed dispatch is handed to an [`ExceptionRenderer`] exactly once.
//! [`DefaultRenderer`] produces a JSON error envelope for API routes and
//! clients that accept JSON, and plain text otherwise.

use http::header::ACCEPT;
use http::{HeaderValue, Method};
use keel_core::{KeelError, Request, RequestId, Response, ResponseExt};
use keel_middleware::REQUEST_ID_HEADER;

/// What the renderer knows about the failed request.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The request ID assigned by the kernel.
    pub request_id: Option<RequestId>,
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Whether the error should be rendered as JSON.
    pub wants_json: bool,
}

impl ErrorContext {
    /// Captures the context of `request`.
    ///
    /// `wants_json` starts out true when the `Accept` header mentions
    /// `application/json`; the kernel also sets it for API routes.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        Self {
            request_id: request.extensions().get::<RequestId>().copied(),
            method: request.method().clone(),
            path: request.path().to_string(),
            wants_json: accepts_json(request),
        }
    }
}

/// Turns a dispatch error into a response.
///
/// Implementations must not fail; whatever they return is sent as is.
pub trait ExceptionRenderer: Send + Sync + 'static {
    /// Renders `error` for the request described by `context`.
    fn render(&self, error: &KeelError, context: &ErrorContext) -> Response;
}

/// The renderer installed when none is configured.
///
/// Server errors carry only a generic message unless `debug` is on.
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use keel_core::KeelError;
/// use keel_kernel::{DefaultRenderer, ErrorContext, ExceptionRenderer};
///
/// let context = ErrorContext {
///     request_id: None,
///     method: Method::GET,
///     path: "/missing".to_string(),
///     wants_json: false,
/// };
/// let response = DefaultRenderer::new().render(&KeelError::not_found("GET", "/missing"), &context);
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRenderer {
    debug: bool,
    json: bool,
}

impl DefaultRenderer {
    /// Creates a renderer that hides server error details.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes error messages and details for server errors.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Renders every error as JSON, regardless of the request.
    #[must_use]
    pub fn always_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn render_json(&self, error: &KeelError, context: &ErrorContext) -> Response {
        let request_id = context.request_id.map(|id| id.to_string());
        let envelope = error.to_envelope(request_id.as_deref(), self.debug);
        let body = serde_json::to_value(&envelope).unwrap_or_else(|_| {
            serde_json::json!({
                "error": { "code": error.error_code(), "message": "An internal error occurred" }
            })
        });

        let mut response = Response::json(&body);
        *response.status_mut() = error.status_code();
        response
    }

    fn render_text(&self, error: &KeelError) -> Response {
        let status = error.status_code();
        let message = if self.debug || !status.is_server_error() {
            error.to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        };
        Response::text(status, message)
    }
}

impl ExceptionRenderer for DefaultRenderer {
    fn render(&self, error: &KeelError, context: &ErrorContext) -> Response {
        let mut response = if self.json || context.wants_json {
            self.render_json(error, context)
        } else {
            self.render_text(error)
        };

        if let Some(request_id) = context.request_id {
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
        }
        response
    }
}

fn accepts_json(request: &Request) -> bool {
    request
        .headers()
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::BodyExt;

    fn context(wants_json: bool) -> ErrorContext {
        ErrorContext {
            request_id: Some(RequestId::new()),
            method: Method::GET,
            path: "/users/7".to_string(),
            wants_json,
        }
    }

    async fn body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_text_hides_server_error_details() {
        let error = KeelError::unbound("UserRepository");
        let response = DefaultRenderer::new().render(&error, &context(false));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_text_debug_shows_details() {
        let error = KeelError::unbound("UserRepository");
        let response = DefaultRenderer::new().debug(true).render(&error, &context(false));
        assert!(body(response).await.contains("UserRepository"));
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let error = KeelError::not_found("GET", "/users/7");
        let response = DefaultRenderer::new().render(&error, &context(false));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await, "No route matches GET /users/7");
    }

    #[tokio::test]
    async fn test_json_envelope() {
        let context = context(true);
        let error = KeelError::not_found("GET", "/users/7");
        let response = DefaultRenderer::new().render(&error, &context);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json: serde_json::Value = serde_json::from_str(&body(response).await).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["category"], "not_found");
        assert_eq!(
            json["request_id"],
            context.request_id.unwrap().to_string().as_str()
        );
        assert!(json["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_always_json() {
        let error = KeelError::handler_with_status(StatusCode::CONFLICT, "already exists");
        let response = DefaultRenderer::new()
            .always_json(true)
            .render(&error, &context(false));
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let json: serde_json::Value = serde_json::from_str(&body(response).await).unwrap();
        assert_eq!(json["error"]["code"], "HANDLER_ERROR");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("already exists"));
    }

    #[test]
    fn test_context_from_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/users?page=2")
            .header("accept", "application/json, text/plain")
            .build()
            .unwrap();

        let context = ErrorContext::from_request(&request);
        assert_eq!(context.method, Method::POST);
        assert_eq!(context.path, "/api/users");
        assert!(context.wants_json);
        assert!(context.request_id.is_none());
    }
}
