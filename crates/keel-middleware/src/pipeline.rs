//! Middleware chain composition.
//!
//! [`Pipeline::compose`] turns an ordered list of [`MiddlewareRef`]s and a
//! terminal into a single [`Next`]. The chain is built back to front: the
//! terminal is wrapped by the last middleware, that by the one before it, and
//! so on. Middleware therefore run first-to-last on the way in and
//! last-to-first on the way out:
//!
//! ```text
//! Request → A → B → C → terminal
//!                          ↓
//! Response ← A ← B ← C ←───┘
//! ```
//!
//! ## Middleware groups
//!
//! A pipeline may define named groups (`"web" = ["session", "csrf"]`). A
//! named reference that matches a group is replaced by the group's members
//! before resolution. Expansion is one level deep: a member that names
//! another group is resolved as a plain middleware name.

use std::collections::HashMap;
use std::sync::Arc;

use keel_core::{Container, KeelError, KeelResult, Key};
use tracing::{debug, trace};

use crate::middleware::{Middleware, Next};
use crate::reference::MiddlewareRef;

/// Composes middleware chains.
///
/// A pipeline is immutable once built and is shared by every request.
///
/// # Example
///
/// ```
/// use keel_core::{Container, Request, Response, ResponseExt};
/// use keel_middleware::{MiddlewareRef, Next, Pipeline, SetHeaderMiddleware};
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder()
///     .group("web", ["powered-by"])
///     .build();
///
/// let mut container = Container::new();
/// keel_middleware::MiddlewareRegistry::middleware_instance(
///     &mut container,
///     "powered-by",
///     SetHeaderMiddleware::new("x-powered-by", "keel").unwrap(),
/// );
///
/// let chain = pipeline
///     .compose(
///         &container,
///         &[MiddlewareRef::named("web")],
///         Next::terminal(|_req| async { Ok(Response::html("ok")) }),
///     )
///     .unwrap();
///
/// let response = chain.run(Request::builder().build().unwrap()).await.unwrap();
/// assert_eq!(response.headers()["x-powered-by"], "keel");
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    groups: HashMap<String, Vec<MiddlewareRef>>,
}

impl Pipeline {
    /// Creates a pipeline without middleware groups.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the members of a middleware group.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&[MiddlewareRef]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Returns the number of middleware groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Replaces group names with their members, one level deep.
    #[must_use]
    pub fn expand(&self, middleware: &[MiddlewareRef]) -> Vec<MiddlewareRef> {
        let mut expanded = Vec::with_capacity(middleware.len());
        for reference in middleware {
            match reference.as_name().and_then(|name| self.groups.get(name)) {
                Some(members) => {
                    trace!(group = %reference.describe(), members = members.len(), "expanding middleware group");
                    expanded.extend(members.iter().cloned());
                }
                None => expanded.push(reference.clone()),
            }
        }
        expanded
    }

    /// Resolves one reference to a middleware instance.
    ///
    /// Named references are looked up in `container`. An unknown name, or a
    /// binding that does not produce a middleware, is a configuration error.
    pub fn resolve(
        &self,
        container: &Container,
        reference: &MiddlewareRef,
    ) -> KeelResult<Arc<dyn Middleware>> {
        match reference {
            MiddlewareRef::Inline(middleware) | MiddlewareRef::Instance(middleware) => {
                Ok(Arc::clone(middleware))
            }
            MiddlewareRef::Named(name) => {
                let key = Key::name(name.as_str());
                if !container.has(&key) {
                    return Err(KeelError::configuration(format!(
                        "unknown middleware '{name}'"
                    )));
                }
                let instance = container.resolve(&key)?;
                instance
                    .downcast_ref::<Arc<dyn Middleware>>()
                    .cloned()
                    .ok_or_else(|| {
                        KeelError::configuration(format!("binding '{name}' is not a middleware"))
                    })
            }
        }
    }

    /// Composes `middleware` around `terminal`.
    ///
    /// Every reference is resolved before the chain is assembled, so a bad
    /// reference fails composition instead of failing halfway through a
    /// request.
    pub fn compose(
        &self,
        container: &Container,
        middleware: &[MiddlewareRef],
        terminal: Next,
    ) -> KeelResult<Next> {
        let resolved = self.resolve_all(container, middleware)?;
        Ok(Self::chain(resolved, terminal))
    }

    /// Expands groups and resolves every reference, in order.
    ///
    /// Fails on the first reference that cannot be resolved.
    pub fn resolve_all(
        &self,
        container: &Container,
        middleware: &[MiddlewareRef],
    ) -> KeelResult<Vec<Arc<dyn Middleware>>> {
        self.expand(middleware)
            .iter()
            .map(|reference| self.resolve(container, reference))
            .collect()
    }

    /// Wraps `terminal` in already-resolved middleware, first entry outermost.
    #[must_use]
    pub fn chain(resolved: Vec<Arc<dyn Middleware>>, terminal: Next) -> Next {
        let mut next = terminal;
        for middleware in resolved.into_iter().rev() {
            next = Next::new(middleware, next);
        }

        debug!(middleware = ?next.names(), "composed middleware chain");
        next
    }
}

/// Composes `middleware` around `terminal` without middleware groups.
pub fn compose(
    container: &Container,
    middleware: &[MiddlewareRef],
    terminal: Next,
) -> KeelResult<Next> {
    Pipeline::new().compose(container, middleware, terminal)
}

/// Builder for [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    groups: HashMap<String, Vec<MiddlewareRef>>,
}

impl PipelineBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or replaces) a middleware group.
    #[must_use]
    pub fn group<I, R>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<MiddlewareRef>,
    {
        self.groups
            .insert(name.into(), members.into_iter().map(Into::into).collect());
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            groups: self.groups,
        }
    }
}
