//! End-to-end pipeline integration tests.
//!
//! These tests compose chains from container-registered middleware, inline
//! closures and instances, and check ordering, short-circuiting, group
//! expansion and error propagation through the whole chain.

use std::sync::Arc;

use http::StatusCode;
use http_body_util::BodyExt;
use keel_core::{
    BoxFuture, Container, Injectable, KeelError, KeelResult, Request, RequestId, Resolver,
    Response, ResponseExt,
};
use keel_middleware::{
    Middleware, MiddlewareRef, MiddlewareRegistry, Next, Pipeline, RequestIdMiddleware,
    SetHeaderMiddleware, REQUEST_ID_HEADER,
};
use parking_lot::Mutex;

/// Shared trace of middleware activity.
#[derive(Default)]
struct Trace(Mutex<Vec<String>>);

impl Trace {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Rejects requests without an `authorization` header.
struct RequireAuth {
    trace: Arc<Trace>,
}

impl Injectable for RequireAuth {
    fn construct(deps: &mut Resolver<'_>) -> KeelResult<Self> {
        Ok(Self {
            trace: deps.bound("trace")?,
        })
    }
}

impl Middleware for RequireAuth {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, KeelResult<Response>> {
        Box::pin(async move {
            if request.header("authorization").is_none() {
                self.trace.push("auth-denied");
                return Ok(Response::text(StatusCode::UNAUTHORIZED, "unauthorized"));
            }
            self.trace.push("auth-before");
            let response = next.run(request).await?;
            self.trace.push("auth-after");
            Ok(response)
        })
    }
}

fn container(trace: &Arc<Trace>) -> Container {
    let mut container = Container::new();
    container.instance(Arc::clone(trace));
    container.singleton_middleware::<RequestIdMiddleware>("request-id");
    container.middleware::<RequireAuth>("auth");
    container.middleware_instance(
        "nosniff",
        SetHeaderMiddleware::new("x-content-type-options", "nosniff").unwrap(),
    );
    container
}

fn pipeline() -> Pipeline {
    Pipeline::builder()
        .group("web", ["request-id", "nosniff"])
        .group("secure", ["request-id", "auth"])
        .build()
}

fn handler(trace: &Arc<Trace>) -> Next {
    let trace = Arc::clone(trace);
    Next::terminal(move |req: Request| async move {
        trace.push("handler");
        let id = req
            .extensions()
            .get::<RequestId>()
            .map(ToString::to_string)
            .unwrap_or_default();
        Ok(Response::html(id))
    })
}

fn request(authorized: bool) -> Request {
    let mut builder = Request::builder().uri("/dashboard");
    if authorized {
        builder = builder.header("authorization", "Bearer token");
    }
    builder.build().unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_web_group_sets_headers_and_request_id() {
    let trace = Arc::new(Trace::default());
    let container = container(&trace);

    let chain = pipeline()
        .compose(&container, &["web".into()], handler(&trace))
        .unwrap();
    let response = chain.run(request(false)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let header_id = response.headers()[REQUEST_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(body_string(response).await, header_id);
}

#[tokio::test]
async fn test_secure_group_short_circuits_without_credentials() {
    let trace = Arc::new(Trace::default());
    let container = container(&trace);

    let chain = pipeline()
        .compose(&container, &["secure".into()], handler(&trace))
        .unwrap();
    let response = chain.run(request(false)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // Request ID middleware ran before auth, so the short-circuit response
    // still carries the header on the way out.
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    assert_eq!(trace.entries(), vec!["auth-denied"]);
}

#[tokio::test]
async fn test_secure_group_allows_credentials() {
    let trace = Arc::new(Trace::default());
    let container = container(&trace);

    let chain = pipeline()
        .compose(&container, &["secure".into()], handler(&trace))
        .unwrap();
    let response = chain.run(request(true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trace.entries(), vec!["auth-before", "handler", "auth-after"]);
}

#[tokio::test]
async fn test_mixed_reference_kinds_keep_declaration_order() {
    let trace = Arc::new(Trace::default());
    let container = container(&trace);

    let inline_trace = Arc::clone(&trace);
    let inline = MiddlewareRef::inline(move |req: Request, next: Next| {
        let trace = Arc::clone(&inline_trace);
        async move {
            trace.push("inline-before");
            let response = next.run(req).await;
            trace.push("inline-after");
            response
        }
    });

    let chain = pipeline()
        .compose(&container, &[inline, "auth".into()], handler(&trace))
        .unwrap();
    assert_eq!(chain.names(), vec!["inline", "auth"]);
    chain.run(request(true)).await.unwrap();

    assert_eq!(
        trace.entries(),
        vec!["inline-before", "auth-before", "handler", "auth-after", "inline-after"]
    );
}

#[tokio::test]
async fn test_handler_error_propagates_through_chain() {
    let trace = Arc::new(Trace::default());
    let container = container(&trace);

    let failing = Next::terminal(|_req: Request| async {
        Err(KeelError::handler_with_status(StatusCode::CONFLICT, "already exists"))
    });
    let chain = pipeline()
        .compose(&container, &["secure".into()], failing)
        .unwrap();

    let err = chain.run(request(true)).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    // The auth middleware propagated the error with `?` and never reached
    // its post-processing step.
    assert_eq!(trace.entries(), vec!["auth-before"]);
}

#[test]
fn test_missing_dependency_surfaces_at_composition() {
    let mut container = Container::new();
    container.middleware::<RequireAuth>("auth");

    let err = pipeline()
        .compose(&container, &["auth".into()], Next::terminal(|_req: Request| async {
            Ok(Response::html("unreachable"))
        }))
        .unwrap_err();
    assert!(matches!(err, KeelError::UnresolvableDependency { ref parameter, .. } if parameter == "trace"));
}
