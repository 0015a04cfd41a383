//! Immutable routes.

use std::fmt;
use std::sync::Arc;

use http::Method;
use keel_core::{CurrentRoute, Handler, RouteParams};
use keel_middleware::MiddlewareRef;
use regex::Regex;

use crate::pattern::Pattern;

/// A registered route.
///
/// Routes are produced by [`RouteRegistrar::build`](crate::RouteRegistrar::build)
/// and never change afterwards. Group prefixes, middleware and name prefixes
/// are already folded into the route.
#[derive(Clone)]
pub struct Route {
    pub(crate) methods: Vec<Method>,
    pub(crate) pattern: Pattern,
    pub(crate) handler: Handler,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) name: Option<String>,
    pub(crate) constraints: Vec<(String, Regex)>,
    pub(crate) api: bool,
}

impl Route {
    /// Returns the methods this route answers to.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Returns the effective path pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the terminal handler.
    #[must_use]
    pub const fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Returns the middleware, group middleware first.
    #[must_use]
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    /// Returns the route name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the constraint for a parameter, if any.
    #[must_use]
    pub fn constraint(&self, param: &str) -> Option<&Regex> {
        self.constraints
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, regex)| regex)
    }

    /// Returns `true` for API routes, whose structured replies are
    /// serialized as JSON.
    #[must_use]
    pub const fn is_api(&self) -> bool {
        self.api
    }

    /// Returns `true` if the route answers to `method`.
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Matches `path` against the pattern and the parameter constraints.
    ///
    /// Parameters that captured nothing are not checked against their
    /// constraint.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let params = self.pattern.captures(path)?;
        let satisfied = params.iter().all(|(name, value)| match value {
            Some(value) => self
                .constraint(name)
                .map_or(true, |regex| regex.is_match(value)),
            None => true,
        });
        satisfied.then_some(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern.to_string())
            .field("handler", &self.handler)
            .field("middleware", &self.middleware)
            .field("name", &self.name)
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

/// A successful route match.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route.
    pub route: Arc<Route>,
    /// Captured parameters in pattern order.
    pub params: RouteParams,
}

impl RouteMatch {
    /// Returns a captured parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Describes the match for request-scoped injection.
    #[must_use]
    pub fn current_route(&self) -> CurrentRoute {
        CurrentRoute {
            name: self.route.name.clone(),
            pattern: self.route.pattern.to_string(),
            methods: self.route.methods.clone(),
            params: self.params.clone(),
            api: self.route.api,
        }
    }
}
