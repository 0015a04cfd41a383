//! Registering middleware in the container.
//!
//! Named [`MiddlewareRef`](crate::MiddlewareRef)s are resolved through the
//! container under their name. [`MiddlewareRegistry`] binds a middleware
//! type, instance or closure under such a name.

use std::future::Future;
use std::sync::Arc;

use keel_core::{Container, Injectable, KeelResult, Request, Response};
use tracing::debug;

use crate::middleware::{FnMiddleware, Middleware, Next};

/// Container extension for registering named middleware.
///
/// # Example
///
/// ```
/// use keel_core::Container;
/// use keel_middleware::{MiddlewareRegistry, RequestIdMiddleware};
///
/// let mut container = Container::new();
/// container.singleton_middleware::<RequestIdMiddleware>("request-id");
/// assert!(container.has(&"request-id".into()));
/// ```
pub trait MiddlewareRegistry {
    /// Registers `M` under `name`, constructing a fresh instance per chain.
    fn middleware<M: Middleware + Injectable>(&mut self, name: &str);

    /// Registers `M` under `name`, constructed once and shared.
    fn singleton_middleware<M: Middleware + Injectable>(&mut self, name: &str);

    /// Registers a ready instance under `name`.
    fn middleware_instance<M: Middleware>(&mut self, name: &str, middleware: M);

    /// Registers an async closure under `name`.
    fn middleware_fn<F, Fut>(&mut self, name: &'static str, f: F)
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KeelResult<Response>> + Send + 'static;
}

impl MiddlewareRegistry for Container {
    fn middleware<M: Middleware + Injectable>(&mut self, name: &str) {
        debug!(name, "registering middleware");
        self.bind_named::<dyn Middleware, _>(name, |deps| {
            let middleware: Arc<dyn Middleware> = deps.construct::<M>()?;
            Ok(middleware)
        });
    }

    fn singleton_middleware<M: Middleware + Injectable>(&mut self, name: &str) {
        debug!(name, "registering singleton middleware");
        self.singleton_named::<dyn Middleware, _>(name, |deps| {
            let middleware: Arc<dyn Middleware> = deps.construct::<M>()?;
            Ok(middleware)
        });
    }

    fn middleware_instance<M: Middleware>(&mut self, name: &str, middleware: M) {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        self.instance_named(name, middleware);
    }

    fn middleware_fn<F, Fut>(&mut self, name: &'static str, f: F)
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KeelResult<Response>> + Send + 'static,
    {
        self.middleware_instance(name, FnMiddleware::new(name, f));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::RequestIdMiddleware;

    #[test]
    fn test_singleton_middleware_is_shared() {
        let mut container = Container::new();
        container.singleton_middleware::<RequestIdMiddleware>("request-id");

        let a = container.named::<dyn Middleware>("request-id").unwrap();
        let b = container.named::<dyn Middleware>("request-id").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "request_id");
    }

    #[test]
    fn test_transient_middleware_is_rebuilt() {
        let mut container = Container::new();
        container.middleware::<RequestIdMiddleware>("request-id");

        let a = container.named::<dyn Middleware>("request-id").unwrap();
        let b = container.named::<dyn Middleware>("request-id").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_middleware_fn() {
        let mut container = Container::new();
        container.middleware_fn("noop", |request: Request, next: Next| async move {
            next.run(request).await
        });

        let middleware = container.named::<dyn Middleware>("noop").unwrap();
        assert_eq!(middleware.name(), "noop");
    }
}
