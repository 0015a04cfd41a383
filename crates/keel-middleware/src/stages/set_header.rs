//! Response header middleware.

use http::{HeaderName, HeaderValue};
use keel_core::{BoxFuture, KeelError, KeelResult, Request, Response};

use crate::middleware::{Middleware, Next};

/// Middleware that sets a header on every response passing through it.
///
/// The header is written after the inner chain returns, replacing any value
/// set further in unless [`SetHeaderMiddleware::if_missing`] is used.
///
/// # Example
///
/// ```
/// use keel_middleware::SetHeaderMiddleware;
///
/// let middleware = SetHeaderMiddleware::new("x-frame-options", "DENY").unwrap();
/// assert!(SetHeaderMiddleware::new("bad header", "x").is_err());
/// # let _ = middleware;
/// ```
#[derive(Debug, Clone)]
pub struct SetHeaderMiddleware {
    name: HeaderName,
    value: HeaderValue,
    overwrite: bool,
}

impl SetHeaderMiddleware {
    /// Creates a middleware that sets `name: value`.
    pub fn new(name: &str, value: &str) -> KeelResult<Self> {
        let name = HeaderName::try_from(name)
            .map_err(|e| KeelError::configuration(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| KeelError::configuration(format!("invalid header value for '{name}': {e}")))?;
        Ok(Self {
            name,
            value,
            overwrite: true,
        })
    }

    /// Leaves the header alone when the inner chain already set it.
    #[must_use]
    pub fn if_missing(mut self) -> Self {
        self.overwrite = false;
        self
    }
}

impl Middleware for SetHeaderMiddleware {
    fn name(&self) -> &'static str {
        "set_header"
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, KeelResult<Response>> {
        Box::pin(async move {
            let mut response = next.run(request).await?;
            let headers = response.headers_mut();
            if self.overwrite || !headers.contains_key(&self.name) {
                headers.insert(self.name.clone(), self.value.clone());
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use keel_core::ResponseExt;

    fn terminal_with(header: Option<&'static str>) -> Next {
        Next::terminal(move |_req| async move {
            let mut response = Response::html("ok");
            if let Some(value) = header {
                response
                    .headers_mut()
                    .insert("x-frame-options", HeaderValue::from_static(value));
            }
            Ok(response)
        })
    }

    fn request() -> Request {
        Request::builder().build().unwrap()
    }

    #[tokio::test]
    async fn test_sets_header() {
        let middleware = SetHeaderMiddleware::new("x-frame-options", "DENY").unwrap();
        let response = middleware.process(request(), terminal_with(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_overwrites_by_default() {
        let middleware = SetHeaderMiddleware::new("x-frame-options", "DENY").unwrap();
        let response = middleware
            .process(request(), terminal_with(Some("SAMEORIGIN")))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_if_missing_keeps_inner_value() {
        let middleware = SetHeaderMiddleware::new("x-frame-options", "DENY")
            .unwrap()
            .if_missing();
        let response = middleware
            .process(request(), terminal_with(Some("SAMEORIGIN")))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
    }

    #[test]
    fn test_invalid_header_is_configuration_error() {
        assert!(matches!(
            SetHeaderMiddleware::new("bad header", "x"),
            Err(KeelError::Configuration { .. })
        ));
        assert!(SetHeaderMiddleware::new("x-ok", "line\nbreak").is_err());
    }
}
