//! Request ID middleware.
//!
//! Assigns every request a [`RequestId`] (UUID v7), stores it in the request
//! extensions so handlers and later middleware can read it, and echoes it in
//! the `x-request-id` response header.
//!
//! An ID already present in the extensions (the kernel assigns one before
//! dispatch) is kept. Incoming `x-request-id` headers are ignored unless the
//! middleware is built with [`RequestIdMiddleware::trust_incoming`]; a valid
//! trusted header takes precedence over everything, invalid values are
//! always replaced.

use http::HeaderValue;
use keel_core::{BoxFuture, Injectable, KeelResult, Request, RequestId, Resolver, Response};

use crate::middleware::{Middleware, Next};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that generates or propagates request IDs.
///
/// # Example
///
/// ```
/// use keel_middleware::{MiddlewareRef, RequestIdMiddleware};
///
/// let reference = MiddlewareRef::instance(RequestIdMiddleware::trust_incoming());
/// assert_eq!(reference.describe(), "request_id");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    /// Whether to reuse a valid incoming `x-request-id`.
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates a middleware that always generates a fresh ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that reuses valid incoming IDs.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn incoming(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        request.header(REQUEST_ID_HEADER).and_then(RequestId::parse)
    }
}

impl Injectable for RequestIdMiddleware {
    fn construct(deps: &mut Resolver<'_>) -> KeelResult<Self> {
        Ok(Self {
            trust_incoming: deps.value("trust_incoming", Some(false))?,
        })
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        mut request: Request,
        next: Next,
    ) -> BoxFuture<'a, KeelResult<Response>> {
        Box::pin(async move {
            let request_id = self
                .incoming(&request)
                .or_else(|| request.extensions().get::<RequestId>().copied())
                .unwrap_or_default();
            request.extensions_mut().insert(request_id);

            let mut response = next.run(request).await?;
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
