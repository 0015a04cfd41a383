//! Route registration.
//!
//! [`RouteRegistrar`] collects route definitions, applies the attributes of
//! every enclosing [`group`](RouteRegistrar::group), and is consumed by
//! [`build`](RouteRegistrar::build) to produce an immutable [`RouteTable`].
//! The group stack lives inside the registrar, so it is empty before
//! registration starts and gone once the table exists.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use keel_core::{Handler, KeelError, KeelResult};
use keel_middleware::MiddlewareRef;
use regex::Regex;
use tracing::{debug, warn};

use crate::pattern::{self, Pattern};
use crate::route::Route;
use crate::table::RouteTable;

/// Constraint accepting digits only.
pub const NUMBER: &str = "[0-9]+";

/// Constraint accepting ASCII letters only.
pub const ALPHA: &str = "[A-Za-z]+";

/// Constraint accepting ASCII letters, digits, dashes and underscores.
pub const SLUG: &str = "[A-Za-z0-9_-]+";

/// Attributes shared by every route registered inside a group.
///
/// # Example
///
/// ```rust
/// use keel_router::GroupAttributes;
///
/// let admin = GroupAttributes::new()
///     .prefix("/admin")
///     .middleware("auth")
///     .name("admin.");
/// ```
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    prefix: String,
    middleware: Vec<MiddlewareRef>,
    name: String,
    api: bool,
}

impl GroupAttributes {
    /// Creates empty attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Appends middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Sets the route name prefix.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the group's routes as API routes.
    #[must_use]
    pub fn api(mut self) -> Self {
        self.api = true;
        self
    }
}

/// A route as declared, before the table is built.
#[derive(Debug)]
struct RouteDefinition {
    methods: Vec<Method>,
    pattern: String,
    handler: Handler,
    middleware: Vec<MiddlewareRef>,
    name_prefix: String,
    name: Option<String>,
    constraints: Vec<(String, String)>,
    api: bool,
}

/// Fluent handle on the route just registered.
#[derive(Debug)]
pub struct RouteHandle<'r> {
    definition: &'r mut RouteDefinition,
}

impl RouteHandle<'_> {
    /// Appends middleware after any inherited group middleware.
    pub fn middleware(self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.definition.middleware.push(middleware.into());
        self
    }

    /// Names the route. Enclosing group name prefixes are prepended.
    pub fn name(self, name: &str) -> Self {
        self.definition.name = Some(format!("{}{name}", self.definition.name_prefix));
        self
    }

    /// Constrains a parameter to a regular expression.
    ///
    /// The expression must match the whole captured value.
    pub fn constraint(self, param: &str, regex: &str) -> Self {
        self.definition
            .constraints
            .push((param.to_string(), regex.to_string()));
        self
    }

    /// Constrains parameters to digits.
    pub fn where_number(self, params: &[&str]) -> Self {
        params
            .iter()
            .fold(self, |handle, param| handle.constraint(param, NUMBER))
    }

    /// Constrains parameters to ASCII letters.
    pub fn where_alpha(self, params: &[&str]) -> Self {
        params
            .iter()
            .fold(self, |handle, param| handle.constraint(param, ALPHA))
    }

    /// Marks the route as an API route.
    pub fn api(self) -> Self {
        self.definition.api = true;
        self
    }
}

/// Collects routes and builds the [`RouteTable`].
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use keel_router::{GroupAttributes, RouteRegistrar};
///
/// let mut routes = RouteRegistrar::new();
/// routes.get("/", "HomeController@index").name("home");
/// routes.group(GroupAttributes::new().prefix("/admin").name("admin."), |routes| {
///     routes.get("/users/{id}", "UserController@show").name("users.show").where_number(&["id"]);
/// });
///
/// let table = routes.build().unwrap();
/// let matched = table.match_route(&Method::GET, "/admin/users/7").unwrap();
/// assert_eq!(matched.route.name(), Some("admin.users.show"));
/// assert_eq!(matched.param("id"), Some("7"));
/// ```
#[derive(Debug, Default)]
pub struct RouteRegistrar {
    routes: Vec<RouteDefinition>,
    groups: Vec<GroupAttributes>,
}

impl RouteRegistrar {
    /// Creates an empty registrar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route for `methods`.
    ///
    /// `handler` is either an inline [`Handler`] or a `"target@action"`
    /// string.
    pub fn add_route(
        &mut self,
        methods: &[Method],
        pattern: &str,
        handler: impl Into<Handler>,
    ) -> RouteHandle<'_> {
        let prefixes = self.groups.iter().map(|group| group.prefix.as_str());
        let definition = RouteDefinition {
            methods: methods.to_vec(),
            pattern: pattern::join(prefixes.chain(std::iter::once(pattern))),
            handler: handler.into(),
            middleware: self
                .groups
                .iter()
                .flat_map(|group| group.middleware.iter().cloned())
                .collect(),
            name_prefix: self.groups.iter().map(|group| group.name.as_str()).collect(),
            name: None,
            constraints: Vec::new(),
            api: self.groups.iter().any(|group| group.api),
        };
        debug!(
            methods = ?definition.methods,
            pattern = %definition.pattern,
            handler = %definition.handler.describe(),
            "registering route"
        );

        self.routes.push(definition);
        let index = self.routes.len() - 1;
        RouteHandle {
            definition: &mut self.routes[index],
        }
    }

    /// Registers a `GET` route; it also answers `HEAD`.
    pub fn get(&mut self, pattern: &str, handler: impl Into<Handler>) -> RouteHandle<'_> {
        self.add_route(&[Method::GET, Method::HEAD], pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, pattern: &str, handler: impl Into<Handler>) -> RouteHandle<'_> {
        self.add_route(&[Method::POST], pattern, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, pattern: &str, handler: impl Into<Handler>) -> RouteHandle<'_> {
        self.add_route(&[Method::PUT], pattern, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&mut self, pattern: &str, handler: impl Into<Handler>) -> RouteHandle<'_> {
        self.add_route(&[Method::PATCH], pattern, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, pattern: &str, handler: impl Into<Handler>) -> RouteHandle<'_> {
        self.add_route(&[Method::DELETE], pattern, handler)
    }

    /// Registers an `OPTIONS` route.
    pub fn options(&mut self, pattern: &str, handler: impl Into<Handler>) -> RouteHandle<'_> {
        self.add_route(&[Method::OPTIONS], pattern, handler)
    }

    /// Registers a route answering every standard method.
    pub fn any(&mut self, pattern: &str, handler: impl Into<Handler>) -> RouteHandle<'_> {
        self.add_route(
            &[
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            pattern,
            handler,
        )
    }

    /// Registers a route for the listed methods.
    pub fn match_methods(
        &mut self,
        methods: &[Method],
        pattern: &str,
        handler: impl Into<Handler>,
    ) -> RouteHandle<'_> {
        self.add_route(methods, pattern, handler)
    }

    /// Registers routes inside a group.
    ///
    /// Prefixes are path-joined, middleware is appended outer to inner, name
    /// prefixes are concatenated, and the API flag is inherited.
    pub fn group<F>(&mut self, attributes: GroupAttributes, routes: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.groups.push(attributes);
        routes(self);
        self.groups.pop();
        self
    }

    /// Shorthand for a group that only sets a prefix.
    pub fn prefix<F>(&mut self, prefix: &str, routes: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.group(GroupAttributes::new().prefix(prefix), routes)
    }

    /// Returns the number of routes registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Validates every definition and builds the immutable table.
    ///
    /// Fails with a configuration error on malformed patterns, invalid
    /// constraint expressions, bad handler references, routes without
    /// methods and duplicate route names.
    pub fn build(self) -> KeelResult<RouteTable> {
        let mut routes = Vec::with_capacity(self.routes.len());
        let mut names = HashMap::new();

        for definition in self.routes {
            let route = compile(definition)?;
            if let Some(name) = &route.name {
                if names.insert(name.clone(), routes.len()).is_some() {
                    return Err(KeelError::configuration(format!(
                        "duplicate route name '{name}'"
                    )));
                }
            }
            routes.push(Arc::new(route));
        }

        debug!(routes = routes.len(), named = names.len(), "route table built");
        Ok(RouteTable::new(routes, names))
    }
}

fn compile(definition: RouteDefinition) -> KeelResult<Route> {
    if definition.methods.is_empty() {
        return Err(KeelError::configuration(format!(
            "route '{}' has no methods",
            definition.pattern
        )));
    }
    definition.handler.validate()?;
    let pattern = Pattern::parse(&definition.pattern)?;

    let mut constraints = Vec::with_capacity(definition.constraints.len());
    for (param, expression) in definition.constraints {
        if !pattern.has_param(&param) {
            warn!(
                pattern = %pattern,
                param = %param,
                "constraint names a parameter the pattern does not declare"
            );
        }
        let regex = Regex::new(&format!("^(?:{expression})$")).map_err(|e| {
            KeelError::configuration(format!(
                "invalid constraint for '{param}' on route '{pattern}': {e}"
            ))
        })?;
        constraints.retain(|(name, _): &(String, Regex)| *name != param);
        constraints.push((param, regex));
    }

    Ok(Route {
        methods: definition.methods,
        pattern,
        handler: definition.handler,
        middleware: definition.middleware,
        name: definition.name,
        constraints,
        api: definition.api,
    })
}
