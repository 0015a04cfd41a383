//! The dispatch kernel.
//!
//! [`Kernel::dispatch`] drives one request through the state machine
//! described by [`Phase`]:
//!
//! ```text
//! Matching ─→ ComposingChain ─→ Resolving ─→ Executing ─→ Normalizing ─→ Done
//!     │              │              │            │             │
//!     └──────────────┴──────────────┴────────────┴─────────────┴─→ Failed
//! ```
//!
//! Everything below the kernel reports failure as `Err(KeelError)`. The
//! kernel is the only place where an error becomes a response, through the
//! configured [`ExceptionRenderer`].
//!
//! The handler is resolved by the terminal of the middleware chain, so a
//! middleware that answers early never constructs the controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use keel_config::{KeelConfig, KernelSettings};
use keel_core::{
    Container, Controller, Handler, HandlerFn, KeelError, KeelResult, Key, Reply, Request,
    RequestId, Response, RouteParams,
};
use keel_middleware::{
    MiddlewareRef, MiddlewareRegistry, Next, Pipeline, PipelineBuilder, RequestIdMiddleware,
    REQUEST_ID_HEADER,
};
use keel_router::{RouteRegistrar, RouteTable};
use parking_lot::Mutex;
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};

use crate::normalize::normalize;
use crate::phase::Phase;
use crate::renderer::{DefaultRenderer, ErrorContext, ExceptionRenderer};

/// Name under which the built-in request ID middleware is registered.
pub const REQUEST_ID_MIDDLEWARE: &str = "request_id";

/// The outcome of one dispatch.
#[derive(Debug)]
pub struct Dispatch {
    /// The response to send.
    pub response: Response,
    /// Every phase the request passed through, in order.
    pub phases: Vec<Phase>,
    /// The error handed to the renderer, if the dispatch failed.
    pub error: Option<KeelError>,
}

impl Dispatch {
    /// Returns the last phase reached.
    #[must_use]
    pub fn final_phase(&self) -> Phase {
        self.phases.last().copied().unwrap_or(Phase::Idle)
    }

    /// Returns `true` if the dispatch ended in `Failed`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-dispatch bookkeeping shared with the terminal handler.
#[derive(Debug)]
struct DispatchState {
    phases: Mutex<Vec<Phase>>,
    api: AtomicBool,
    route: Mutex<Option<String>>,
}

impl DispatchState {
    fn new() -> Self {
        Self {
            phases: Mutex::new(vec![Phase::Idle]),
            api: AtomicBool::new(false),
            route: Mutex::new(None),
        }
    }

    fn enter(&self, phase: Phase) {
        debug!(phase = %phase, "dispatch phase");
        self.phases.lock().push(phase);
    }

    fn take_phases(&self) -> Vec<Phase> {
        std::mem::take(&mut *self.phases.lock())
    }
}

/// A resolved terminal handler.
enum Target {
    Inline(HandlerFn),
    Action {
        controller: Arc<dyn Controller>,
        action: String,
    },
}

impl Target {
    async fn invoke(self, request: Request, params: RouteParams) -> KeelResult<Reply> {
        match self {
            Self::Inline(handler) => handler(request, params).await,
            Self::Action { controller, action } => {
                controller.call(&action, request, params).await
            }
        }
    }
}

/// The request dispatch kernel.
///
/// A kernel is immutable and cheap to clone; every clone shares the root
/// container, the route table and the renderer.
///
/// # Example
///
/// ```
/// use keel_core::{Handler, KeelResult, Request, RouteParams};
/// use keel_kernel::Kernel;
///
/// # tokio_test::block_on(async {
/// let kernel = Kernel::builder()
///     .routes(|routes| {
///         let hello = Handler::inline(|_req: Request, params: RouteParams| async move {
///             KeelResult::Ok(format!("hello {}", params.get("name").unwrap_or("?")))
///         });
///         routes.get("/hello/{name}", hello);
///     })
///     .build()
///     .unwrap();
///
/// let request = Request::builder().uri("/hello/keel").build().unwrap();
/// let response = kernel.handle(request).await;
/// assert_eq!(response.status(), 200);
/// # });
/// ```
#[derive(Clone)]
pub struct Kernel {
    container: Arc<Container>,
    routes: Arc<RouteTable>,
    pipeline: Pipeline,
    middleware: Vec<MiddlewareRef>,
    renderer: Arc<dyn ExceptionRenderer>,
    trust_request_id: bool,
}

impl Kernel {
    /// Creates a new kernel builder.
    #[must_use]
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    /// Returns the root container.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Returns the route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the global middleware, outermost first.
    #[must_use]
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    /// Dispatches a request and returns only the response.
    pub async fn handle(&self, request: Request) -> Response {
        self.dispatch(request).await.response
    }

    /// Dispatches an `http::Request`.
    pub async fn handle_http(&self, request: http::Request<Bytes>) -> Response {
        self.handle(Request::from_http(request)).await
    }

    /// Dispatches a request and reports how it went.
    ///
    /// Never fails: errors are rendered by the exception renderer and
    /// returned alongside the response.
    pub async fn dispatch(&self, mut request: Request) -> Dispatch {
        let started = Instant::now();
        let request_id = self.assign_request_id(&mut request);
        let mut context = ErrorContext::from_request(&request);

        let span = info_span!(
            "dispatch",
            method = %request.method(),
            path = %request.path(),
            request_id = %request_id,
            route = field::Empty,
        );

        let state = Arc::new(DispatchState::new());
        let result = self
            .run(request, Arc::clone(&state))
            .instrument(span.clone())
            .await;

        let route = state
            .route
            .lock()
            .take()
            .unwrap_or_else(|| keel_telemetry::metrics::UNMATCHED_ROUTE.to_string());

        match result {
            Ok(response) => {
                state.enter(Phase::Done);
                let status = response.status();
                keel_telemetry::record_dispatch(&route, status.as_u16(), started.elapsed());
                info!(
                    parent: &span,
                    status = status.as_u16(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "request dispatched"
                );

                Dispatch {
                    response,
                    phases: state.take_phases(),
                    error: None,
                }
            }
            Err(err) => {
                state.enter(Phase::Failed);
                context.wants_json |= state.api.load(Ordering::Relaxed);
                let response = self.renderer.render(&err, &context);
                let status = response.status();

                keel_telemetry::record_failure(err.category().as_str());
                keel_telemetry::record_dispatch(&route, status.as_u16(), started.elapsed());
                if status.is_server_error() {
                    error!(
                        parent: &span,
                        status = status.as_u16(),
                        category = %err.category(),
                        error = %err,
                        "dispatch failed"
                    );
                } else {
                    warn!(parent: &span, status = status.as_u16(), error = %err, "dispatch failed");
                }

                Dispatch {
                    response,
                    phases: state.take_phases(),
                    error: Some(err),
                }
            }
        }
    }

    async fn run(&self, mut request: Request, state: Arc<DispatchState>) -> KeelResult<Response> {
        state.enter(Phase::Matching);
        let matched = self.routes.match_route(request.method(), request.path())?;
        let route = Arc::clone(&matched.route);
        let current = matched.current_route();

        let label = route
            .name()
            .map_or_else(|| route.pattern().to_string(), ToString::to_string);
        Span::current().record("route", label.as_str());
        *state.route.lock() = Some(label);
        state.api.store(route.is_api(), Ordering::Relaxed);
        request.extensions_mut().insert(current.clone());

        let mut scope = self.container.scope();
        scope.instance(Arc::new(current));
        if let Some(request_id) = request.extensions().get::<RequestId>().copied() {
            scope.instance(Arc::new(request_id));
        }

        state.enter(Phase::ComposingChain);
        let mut references = self.middleware.clone();
        references.extend(route.middleware().iter().cloned());
        let resolved = self.pipeline.resolve_all(&scope, &references)?;

        let params = matched.params;
        let terminal_state = Arc::clone(&state);
        let terminal = Next::terminal(move |request: Request| async move {
            terminal_state.enter(Phase::Resolving);
            let target = resolve_target(&scope, route.handler())?;

            terminal_state.enter(Phase::Executing);
            let reply = target.invoke(request, params).await?;
            terminal_state.enter(Phase::Normalizing);
            normalize(reply, route.is_api())
        });

        Pipeline::chain(resolved, terminal).run(request).await
    }

    fn assign_request_id(&self, request: &mut Request) -> RequestId {
        let trusted = if self.trust_request_id {
            request.header(REQUEST_ID_HEADER).and_then(RequestId::parse)
        } else {
            None
        };

        let request_id = trusted
            .or_else(|| request.extensions().get::<RequestId>().copied())
            .unwrap_or_default();
        request.extensions_mut().insert(request_id);
        request_id
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware)
            .field("bindings", &self.container.len())
            .finish_non_exhaustive()
    }
}

fn resolve_target(container: &Container, handler: &Handler) -> KeelResult<Target> {
    match handler {
        Handler::Inline(handler) => Ok(Target::Inline(Arc::clone(handler))),
        Handler::Action { target, action } => {
            let controller = container.named::<dyn Controller>(target)?;
            Ok(Target::Action {
                controller,
                action: action.clone(),
            })
        }
    }
}

/// Builder for [`Kernel`].
pub struct KernelBuilder {
    container: Container,
    registrar: RouteRegistrar,
    pipeline: PipelineBuilder,
    middleware: Vec<MiddlewareRef>,
    renderer: Option<Arc<dyn ExceptionRenderer>>,
    debug: bool,
    json_errors: bool,
    trust_request_id: bool,
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelBuilder {
    /// Creates a builder with an empty container, no routes and no global
    /// middleware.
    #[must_use]
    pub fn new() -> Self {
        Self {
            container: Container::new(),
            registrar: RouteRegistrar::new(),
            pipeline: Pipeline::builder(),
            middleware: Vec::new(),
            renderer: None,
            debug: false,
            json_errors: false,
            trust_request_id: false,
        }
    }

    /// Applies the `[kernel]` section of a configuration.
    ///
    /// Global middleware from the configuration are appended to any added
    /// so far.
    #[must_use]
    pub fn config(self, config: &KeelConfig) -> Self {
        self.kernel_settings(&config.kernel)
    }

    /// Applies kernel settings.
    #[must_use]
    pub fn kernel_settings(mut self, settings: &KernelSettings) -> Self {
        self.debug = settings.debug;
        self.json_errors = settings.json_errors;
        self.trust_request_id = settings.trust_request_id;
        self.middleware
            .extend(settings.middleware.iter().map(MiddlewareRef::named));
        for (name, members) in &settings.middleware_groups {
            self.pipeline = self.pipeline.group(name.clone(), members.iter().cloned());
        }
        self
    }

    /// Registers bindings in the root container.
    #[must_use]
    pub fn container<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut Container),
    {
        register(&mut self.container);
        self
    }

    /// Registers routes.
    #[must_use]
    pub fn routes<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut RouteRegistrar),
    {
        register(&mut self.registrar);
        self
    }

    /// Appends a global middleware, wrapped around every route.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Defines a named middleware group.
    #[must_use]
    pub fn middleware_group<I, R>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<MiddlewareRef>,
    {
        self.pipeline = self.pipeline.group(name, members);
        self
    }

    /// Replaces the default exception renderer.
    #[must_use]
    pub fn renderer(mut self, renderer: impl ExceptionRenderer) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Shows error details in rendered responses.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Renders every error as JSON.
    #[must_use]
    pub fn json_errors(mut self, json_errors: bool) -> Self {
        self.json_errors = json_errors;
        self
    }

    /// Reuses well-formed inbound `x-request-id` headers.
    #[must_use]
    pub fn trust_request_id(mut self, trust: bool) -> Self {
        self.trust_request_id = trust;
        self
    }

    /// Builds the route table and freezes the container.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid routes and for named
    /// middleware that are bound nowhere.
    pub fn build(mut self) -> KeelResult<Kernel> {
        let request_id = Key::name(REQUEST_ID_MIDDLEWARE);
        if !self.container.has(&request_id) {
            let middleware = if self.trust_request_id {
                RequestIdMiddleware::trust_incoming()
            } else {
                RequestIdMiddleware::new()
            };
            self.container
                .middleware_instance(REQUEST_ID_MIDDLEWARE, middleware);
        }

        let routes = self.registrar.build()?;
        let pipeline = self.pipeline.build();

        check_names(&self.container, &pipeline, &self.middleware)?;
        for route in routes.routes() {
            check_names(&self.container, &pipeline, route.middleware())?;
            if let Handler::Action { target, .. } = route.handler() {
                if !self.container.has(&Key::name(target.as_str())) {
                    warn!(
                        route = %route.pattern(),
                        target = %target,
                        "route target is not bound; requests to it will fail"
                    );
                }
            }
        }

        let renderer: Arc<dyn ExceptionRenderer> = match self.renderer {
            Some(renderer) => renderer,
            None => Arc::new(
                DefaultRenderer::new()
                    .debug(self.debug)
                    .always_json(self.json_errors),
            ),
        };

        keel_telemetry::describe_metrics();
        info!(
            routes = routes.len(),
            middleware = self.middleware.len(),
            groups = pipeline.group_count(),
            "kernel built"
        );

        Ok(Kernel {
            container: Arc::new(self.container),
            routes: Arc::new(routes),
            pipeline,
            middleware: self.middleware,
            renderer,
            trust_request_id: self.trust_request_id,
        })
    }
}

impl std::fmt::Debug for KernelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelBuilder")
            .field("routes", &self.registrar.len())
            .field("middleware", &self.middleware)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

/// Rejects named middleware that the container cannot produce.
fn check_names(
    container: &Container,
    pipeline: &Pipeline,
    middleware: &[MiddlewareRef],
) -> KeelResult<()> {
    for reference in pipeline.expand(middleware) {
        if let Some(name) = reference.as_name() {
            if !container.has(&Key::name(name)) {
                return Err(KeelError::configuration(format!(
                    "unknown middleware '{name}'"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use keel_core::ResponseExt;

    fn hello() -> Handler {
        Handler::inline(|_req: Request, _params: RouteParams| async {
            KeelResult::Ok(Reply::from("hello"))
        })
    }

    #[tokio::test]
    async fn test_successful_phases() {
        let kernel = Kernel::builder()
            .routes(|routes| {
                routes.get("/", hello());
            })
            .build()
            .unwrap();

        let dispatch = kernel
            .dispatch(Request::builder().uri("/").build().unwrap())
            .await;
        assert!(!dispatch.is_failure());
        assert_eq!(
            dispatch.phases,
            vec![
                Phase::Idle,
                Phase::Matching,
                Phase::ComposingChain,
                Phase::Resolving,
                Phase::Executing,
                Phase::Normalizing,
                Phase::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_not_found_fails_after_matching() {
        let kernel = Kernel::builder().build().unwrap();
        let dispatch = kernel
            .dispatch(Request::builder().uri("/missing").build().unwrap())
            .await;

        assert_eq!(dispatch.response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            dispatch.phases,
            vec![Phase::Idle, Phase::Matching, Phase::Failed]
        );
        assert!(matches!(dispatch.error, Some(KeelError::NotFound { .. })));
        assert!(dispatch.response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_normalizing() {
        let kernel = Kernel::builder()
            .middleware(MiddlewareRef::inline(|_req: Request, _next: Next| async {
                KeelResult::Ok(Response::text(StatusCode::SERVICE_UNAVAILABLE, "down"))
            }))
            .routes(|routes| {
                routes.get("/", hello());
            })
            .build()
            .unwrap();

        let dispatch = kernel
            .dispatch(Request::builder().uri("/").build().unwrap())
            .await;
        assert_eq!(dispatch.response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!dispatch.phases.contains(&Phase::Normalizing));
        assert_eq!(dispatch.final_phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_controller_resolution() {
        let kernel = Kernel::builder()
            .middleware(MiddlewareRef::inline(|_req: Request, _next: Next| async {
                KeelResult::Ok(Response::text(StatusCode::UNAUTHORIZED, "login required"))
            }))
            .routes(|routes| {
                routes.get("/secret", "UnboundController@show");
            })
            .build()
            .unwrap();

        let dispatch = kernel
            .dispatch(Request::builder().uri("/secret").build().unwrap())
            .await;
        assert_eq!(dispatch.response.status(), StatusCode::UNAUTHORIZED);
        assert!(dispatch.error.is_none());
        assert_eq!(
            dispatch.phases,
            vec![
                Phase::Idle,
                Phase::Matching,
                Phase::ComposingChain,
                Phase::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_unbound_controller_fails_while_resolving() {
        let kernel = Kernel::builder()
            .routes(|routes| {
                routes.get("/secret", "UnboundController@show");
            })
            .build()
            .unwrap();

        let dispatch = kernel
            .dispatch(Request::builder().uri("/secret").build().unwrap())
            .await;
        assert_eq!(dispatch.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(dispatch.error, Some(KeelError::UnboundKey { .. })));
        assert_eq!(
            dispatch.phases,
            vec![
                Phase::Idle,
                Phase::Matching,
                Phase::ComposingChain,
                Phase::Resolving,
                Phase::Failed,
            ]
        );
    }

    #[test]
    fn test_unknown_global_middleware_fails_build() {
        let err = Kernel::builder().middleware("auth").build().unwrap_err();
        assert!(matches!(err, KeelError::Configuration { ref message } if message.contains("'auth'")));
    }

    #[test]
    fn test_unknown_group_member_fails_build() {
        let err = Kernel::builder()
            .middleware_group("web", ["session"])
            .routes(|routes| {
                routes.get("/", hello()).middleware("web");
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, KeelError::Configuration { ref message } if message.contains("'session'")));
    }

    #[test]
    fn test_request_id_middleware_is_registered() {
        let kernel = Kernel::builder()
            .middleware(REQUEST_ID_MIDDLEWARE)
            .build()
            .unwrap();
        assert!(kernel.container().has(&Key::name(REQUEST_ID_MIDDLEWARE)));
        assert_eq!(kernel.middleware().len(), 1);
    }

    #[tokio::test]
    async fn test_trusted_request_id_is_used() {
        let incoming = "01234567-89ab-7def-8123-456789abcdef";
        let kernel = Kernel::builder().trust_request_id(true).build().unwrap();

        let response = kernel
            .handle(
                Request::builder()
                    .uri("/missing")
                    .header(REQUEST_ID_HEADER, incoming)
                    .build()
                    .unwrap(),
            )
            .await;
        assert_eq!(response.headers()[REQUEST_ID_HEADER], incoming);
    }
}
