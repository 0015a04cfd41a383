//! Request-scoped context values.
//!
//! [`RequestId`] identifies a request in logs and responses. [`CurrentRoute`]
//! describes the route the kernel matched; it is attached to the request
//! extensions and bound in the request-scoped container.

use http::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RouteParams;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use keel_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID from a header value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The route matched for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentRoute {
    /// Route name, if one was assigned.
    pub name: Option<String>,
    /// Effective path pattern, including group prefixes.
    pub pattern: String,
    /// Methods the route answers to.
    pub methods: Vec<Method>,
    /// Captured parameters in pattern order.
    pub params: RouteParams,
    /// Whether the route is an API route.
    pub api: bool,
}

impl CurrentRoute {
    /// Returns a captured parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_request_id_parse() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&id.to_string()), Some(id));
        assert_eq!(RequestId::parse("not-a-uuid"), None);
    }

    #[test]
    fn test_current_route_param() {
        let mut params = RouteParams::new();
        params.push("id", Some("7".into()));
        let route = CurrentRoute {
            name: Some("users.show".into()),
            pattern: "/users/{id}".into(),
            methods: vec![Method::GET],
            params,
            api: false,
        };
        assert_eq!(route.param("id"), Some("7"));
        assert_eq!(route.param("missing"), None);
    }
}
