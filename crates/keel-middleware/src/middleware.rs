//! Core middleware trait and the composed chain.
//!
//! A [`Middleware`] wraps everything after it in the chain. It may run code
//! before delegating to [`Next`], after the delegate returns, or return a
//! response without delegating at all (short-circuit).
//!
//! # Example
//!
//! ```
//! use keel_core::{BoxFuture, KeelResult, Request, Response};
//! use keel_middleware::{Middleware, Next};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, KeelResult<Response>> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let response = next.run(request).await?;
//!             tracing::debug!(elapsed = ?start.elapsed(), "request finished");
//!             Ok(response)
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use keel_core::{BoxFuture, KeelResult, Request, Response};

/// The core middleware trait.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once; not calling it short-circuits
///   the chain.
/// - Errors from downstream are propagated with `?`, never swallowed.
/// - Middleware registered as a container singleton is shared by every
///   request and must not keep request state in `self`. Per-request data
///   belongs in the request extensions.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str {
        "anonymous"
    }

    /// Processes the request, usually by delegating to `next`.
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, KeelResult<Response>>;
}

/// The terminal callable at the center of a chain.
pub type Terminal = Box<dyn FnOnce(Request) -> BoxFuture<'static, KeelResult<Response>> + Send>;

/// The rest of the chain, handed to each middleware.
///
/// `Next` is consumed by [`Next::run`], so it can be invoked at most once.
pub struct Next {
    inner: NextInner,
}

enum NextInner {
    /// More middleware to process
    Chain {
        middleware: Arc<dyn Middleware>,
        next: Box<Next>,
    },
    /// End of chain
    Terminal(Terminal),
}

impl Next {
    /// Wraps `next` with `middleware`.
    #[must_use]
    pub fn new(middleware: Arc<dyn Middleware>, next: Self) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the innermost link of a chain.
    pub fn terminal<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = KeelResult<Response>> + Send + 'static,
    {
        Self {
            inner: NextInner::Terminal(Box::new(move |request| Box::pin(f(request)))),
        }
    }

    /// Invokes the next middleware, or the terminal if none remain.
    pub async fn run(self, request: Request) -> KeelResult<Response> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(request, *next).await,
            NextInner::Terminal(terminal) => terminal(request).await,
        }
    }

    /// Returns the names of the middleware remaining in this chain.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut current = self;
        while let NextInner::Chain { middleware, next } = &current.inner {
            names.push(middleware.name());
            current = next;
        }
        names
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("middleware", &self.names()).finish()
    }
}

/// A middleware created from an async closure.
///
/// # Example
///
/// ```
/// use keel_core::Request;
/// use keel_middleware::{FnMiddleware, Next};
///
/// let middleware = FnMiddleware::new("passthrough", |request: Request, next: Next| async move {
///     next.run(request).await
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KeelResult<Response>> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, KeelResult<Response>> {
        Box::pin((self.func)(request, next))
    }
}
