//! Middleware references.
//!
//! Routes, groups and the kernel refer to middleware by [`MiddlewareRef`]:
//! a container name, an inline closure, or a ready instance. All three are
//! resolved to [`Middleware`] by the [`Pipeline`](crate::Pipeline) when a
//! chain is composed.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use keel_core::{KeelResult, Request, Response};

use crate::middleware::{FnMiddleware, Middleware, Next};

/// A reference to a middleware.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// A name resolved through the container, or a middleware group name.
    Named(String),
    /// An inline closure.
    Inline(Arc<dyn Middleware>),
    /// A middleware instance.
    Instance(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    /// References middleware by name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wraps an async closure.
    ///
    /// ```
    /// use keel_core::Request;
    /// use keel_middleware::{MiddlewareRef, Next};
    ///
    /// let reference = MiddlewareRef::inline(|request: Request, next: Next| async move {
    ///     next.run(request).await
    /// });
    /// assert_eq!(reference.describe(), "inline");
    /// ```
    pub fn inline<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KeelResult<Response>> + Send + 'static,
    {
        Self::Inline(Arc::new(FnMiddleware::new("inline", f)))
    }

    /// Wraps a middleware instance.
    pub fn instance<M: Middleware>(middleware: M) -> Self {
        Self::Instance(Arc::new(middleware))
    }

    /// Returns the name this reference resolves through, if any.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Inline(_) | Self::Instance(_) => None,
        }
    }

    /// Returns a printable description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Inline(_) => "inline".to_string(),
            Self::Instance(middleware) => middleware.name().to_string(),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::Instance(middleware)
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline"),
            Self::Instance(middleware) => f.debug_tuple("Instance").field(&middleware.name()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::RequestIdMiddleware;

    #[test]
    fn test_named_from_str() {
        let reference = MiddlewareRef::from("auth");
        assert_eq!(reference.as_name(), Some("auth"));
        assert_eq!(reference.describe(), "auth");
    }

    #[test]
    fn test_instance_describes_middleware_name() {
        let reference = MiddlewareRef::instance(RequestIdMiddleware::new());
        assert_eq!(reference.as_name(), None);
        assert_eq!(reference.describe(), "request_id");
        assert_eq!(format!("{reference:?}"), "Instance(\"request_id\")");
    }
}
