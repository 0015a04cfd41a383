//! Route parameter storage.
//!
//! Parameters are kept in pattern order so handlers can consume them
//! positionally. Optional parameters that did not consume a path segment are
//! stored with a `None` value.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Parameters captured by a route match, in pattern order.
///
/// # Example
///
/// ```rust
/// use keel_core::RouteParams;
///
/// let mut params = RouteParams::new();
/// params.push("post", Some("42".to_string()));
/// params.push("page", None);
///
/// assert_eq!(params.get("post"), Some("42"));
/// assert_eq!(params.get("page"), None);
/// assert!(params.contains("page"));
/// assert_eq!(params.nth(0), Some("42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteParams {
    inner: SmallVec<[(String, Option<String>); INLINE_PARAMS]>,
}

impl RouteParams {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a params set with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SmallVec::with_capacity(capacity),
        }
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.inner.push((name.into(), value));
    }

    /// Returns the captured value for a parameter by name.
    ///
    /// Returns `None` both for unknown names and for optional parameters that
    /// captured nothing; use [`RouteParams::contains`] to tell them apart.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Returns true if the route declared a parameter with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, _)| n == name)
    }

    /// Returns the value at `index` in pattern order.
    #[must_use]
    pub fn nth(&self, index: usize) -> Option<&str> {
        self.inner.get(index).and_then(|(_, v)| v.as_deref())
    }

    /// Returns the values in pattern order.
    pub fn positional(&self) -> impl Iterator<Item = Option<&str>> {
        self.inner.iter().map(|(_, v)| v.as_deref())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

impl FromIterator<(String, Option<String>)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
