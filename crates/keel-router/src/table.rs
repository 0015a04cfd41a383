//! The immutable route table.
//!
//! Matching is a linear scan in registration order: the first route whose
//! methods include the request method, whose pattern matches the path, and
//! whose constraints accept the captured values wins. There is no
//! specificity ranking; declaration order is the only priority.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use keel_core::{KeelError, KeelResult};
use tracing::trace;

use crate::route::{Route, RouteMatch};

/// An immutable, ordered set of routes.
///
/// A table is built once by [`RouteRegistrar::build`](crate::RouteRegistrar::build)
/// and shared read-only, typically behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    names: HashMap<String, usize>,
}

impl RouteTable {
    pub(crate) fn new(routes: Vec<Arc<Route>>, names: HashMap<String, usize>) -> Self {
        Self { routes, names }
    }

    /// Finds the route for `method` and `path`.
    ///
    /// Returns [`KeelError::NotFound`] when nothing matches.
    pub fn match_route(&self, method: &Method, path: &str) -> KeelResult<RouteMatch> {
        for route in self.routes.iter().filter(|route| route.allows(method)) {
            if let Some(params) = route.captures(path) {
                trace!(pattern = %route.pattern(), %method, path, "route matched");
                return Ok(RouteMatch {
                    route: Arc::clone(route),
                    params,
                });
            }
        }

        trace!(%method, path, "no route matched");
        Err(KeelError::not_found(method, path))
    }

    /// Returns the methods of every route whose path matches, in table order.
    ///
    /// Useful for answering `405 Method Not Allowed` or `OPTIONS`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for route in &self.routes {
            if route.captures(path).is_some() {
                for method in route.methods() {
                    if !methods.contains(method) {
                        methods.push(method.clone());
                    }
                }
            }
        }
        methods
    }

    /// Generates the path for a named route.
    ///
    /// Every parameter the pattern declares is substituted; parameters the
    /// pattern does not declare are appended as a query string. A missing
    /// optional parameter drops its segment. A missing required parameter or
    /// an unknown route name is a configuration error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use keel_router::RouteRegistrar;
    ///
    /// let mut routes = RouteRegistrar::new();
    /// routes.get("/posts/{post}/comments/{page?}", "CommentController@index").name("comments");
    /// let table = routes.build().unwrap();
    ///
    /// assert_eq!(table.url("comments", &[("post", "9")]).unwrap(), "/posts/9/comments");
    /// assert_eq!(
    ///     table.url("comments", &[("post", "9"), ("page", "2"), ("sort", "new")]).unwrap(),
    ///     "/posts/9/comments/2?sort=new"
    /// );
    /// assert!(table.url("comments", &[]).is_err());
    /// ```
    pub fn url(&self, name: &str, params: &[(&str, &str)]) -> KeelResult<String> {
        let route = self
            .by_name(name)
            .ok_or_else(|| KeelError::configuration(format!("route '{name}' is not defined")))?;
        let pattern = route.pattern();

        let lookup = |param: &str| {
            params
                .iter()
                .find(|(key, _)| *key == param)
                .map(|(_, value)| *value)
        };
        let mut url = pattern.render(lookup).map_err(|missing| {
            KeelError::configuration(format!(
                "missing parameter '{missing}' for route '{name}'"
            ))
        })?;

        let extra: Vec<_> = params
            .iter()
            .filter(|(key, _)| !pattern.has_param(key))
            .collect();
        if !extra.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(extra)
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }

    /// Returns the route registered under `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Arc<Route>> {
        self.names.get(name).and_then(|&index| self.routes.get(index))
    }

    /// Returns every route in match order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::RouteRegistrar;

    fn table() -> RouteTable {
        let mut routes = RouteRegistrar::new();
        routes.get("/users", "UserController@index").name("users.index");
        routes
            .get("/users/{id}", "UserController@show")
            .name("users.show")
            .where_number(&["id"]);
        routes.get("/users/{slug}", "UserController@bySlug");
        routes.post("/users", "UserController@store");
        routes.get("/posts/{page?}", "PostController@index").name("posts");
        routes.build().unwrap()
    }

    #[test]
    fn test_table_len() {
        let table = table();
        assert_eq!(table.len(), 5);
        assert!(!table.is_empty());
        assert!(RouteTable::default().is_empty());
    }

    #[test]
    fn test_match_by_method() {
        let table = table();
        let get = table.match_route(&Method::GET, "/users").unwrap();
        assert_eq!(get.route.handler().describe(), "UserController@index");

        let post = table.match_route(&Method::POST, "/users").unwrap();
        assert_eq!(post.route.handler().describe(), "UserController@store");

        let head = table.match_route(&Method::HEAD, "/users").unwrap();
        assert_eq!(head.route.name(), Some("users.index"));
    }

    #[test]
    fn test_constraint_falls_through() {
        let table = table();

        let numeric = table.match_route(&Method::GET, "/users/42").unwrap();
        assert_eq!(numeric.route.name(), Some("users.show"));
        assert_eq!(numeric.param("id"), Some("42"));

        let slug = table.match_route(&Method::GET, "/users/alice").unwrap();
        assert_eq!(slug.route.handler().describe(), "UserController@bySlug");
        assert_eq!(slug.param("slug"), Some("alice"));
    }

    #[test]
    fn test_constraint_is_anchored() {
        let mut routes = RouteRegistrar::new();
        routes.get("/users/{id}", "U@show").where_number(&["id"]);
        let table = routes.build().unwrap();

        assert!(table.match_route(&Method::GET, "/users/12ab").is_err());
        assert!(table.match_route(&Method::GET, "/users/ab12").is_err());
    }

    #[test]
    fn test_not_found() {
        let table = table();
        let err = table.match_route(&Method::DELETE, "/users/1").unwrap_err();
        assert!(matches!(err, KeelError::NotFound { .. }));
        assert_eq!(err.to_string(), "No route matches DELETE /users/1");
    }

    #[test]
    fn test_first_registered_wins() {
        let mut routes = RouteRegistrar::new();
        routes.get("/pages/{slug}", "Page@show");
        routes.get("/pages/about", "Page@about");
        let table = routes.build().unwrap();

        let matched = table.match_route(&Method::GET, "/pages/about").unwrap();
        assert_eq!(matched.route.handler().describe(), "Page@show");
    }

    #[test]
    fn test_allowed_methods() {
        let table = table();
        assert_eq!(
            table.allowed_methods("/users"),
            vec![Method::GET, Method::HEAD, Method::POST]
        );
        assert!(table.allowed_methods("/nowhere").is_empty());
    }

    #[test]
    fn test_url_generation() {
        let table = table();
        assert_eq!(table.url("users.index", &[]).unwrap(), "/users");
        assert_eq!(table.url("users.show", &[("id", "7")]).unwrap(), "/users/7");
        assert_eq!(table.url("posts", &[]).unwrap(), "/posts");
        assert_eq!(table.url("posts", &[("page", "3")]).unwrap(), "/posts/3");
    }

    #[test]
    fn test_url_query_string_is_encoded() {
        let table = table();
        let url = table
            .url("users.index", &[("q", "a b&c"), ("page", "2")])
            .unwrap();
        assert_eq!(url, "/users?q=a+b%26c&page=2");
    }

    #[test]
    fn test_url_path_values_are_encoded() {
        let table = table();
        let url = table.url("posts", &[("page", "a/b")]).unwrap();
        assert_eq!(url, "/posts/a%2Fb");

        let matched = table.match_route(&Method::GET, &url).unwrap();
        assert_eq!(matched.route.name(), Some("posts"));
    }

    #[test]
    fn test_url_missing_parameter() {
        let err = table().url("users.show", &[]).unwrap_err();
        assert!(matches!(err, KeelError::Configuration { ref message } if message.contains("'id'")));
    }

    #[test]
    fn test_url_unknown_route() {
        assert!(table().url("nope", &[]).is_err());
    }

    #[test]
    fn test_current_route() {
        let table = table();
        let matched = table.match_route(&Method::GET, "/users/7").unwrap();
        let current = matched.current_route();
        assert_eq!(current.name.as_deref(), Some("users.show"));
        assert_eq!(current.pattern, "/users/{id}");
        assert_eq!(current.param("id"), Some("7"));
        assert!(!current.api);
    }
}
