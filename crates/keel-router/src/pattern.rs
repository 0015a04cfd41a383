//! Path patterns.
//!
//! A pattern is a sequence of `/`-separated segments. Each segment is either
//! a literal (`users`) or a parameter: required (`{id}`) or optional
//! (`{page?}`). Empty segments are ignored, so `//users/` and `/users` are
//! the same pattern.
//!
//! Optional parameters may only appear at the end of a pattern.

use std::fmt;

use keel_core::{KeelError, KeelResult, RouteParams};

/// One segment of a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Captures one path segment.
    Param {
        /// Parameter name.
        name: String,
        /// Whether the segment may be absent.
        optional: bool,
    },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal),
            Self::Param {
                name,
                optional: false,
            } => write!(f, "{{{name}}}"),
            Self::Param {
                name,
                optional: true,
            } => write!(f, "{{{name}?}}"),
        }
    }
}

/// A parsed path pattern.
///
/// # Example
///
/// ```rust
/// use keel_router::Pattern;
///
/// let pattern = Pattern::parse("/posts/{post}/comments/{page?}").unwrap();
/// let params = pattern.captures("/posts/42/comments").unwrap();
///
/// assert_eq!(params.get("post"), Some("42"));
/// assert!(params.contains("page"));
/// assert_eq!(params.get("page"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
    param_count: usize,
}

impl Pattern {
    /// Parses a pattern.
    ///
    /// Fails with a configuration error on malformed braces, empty or
    /// duplicate parameter names, and literal or required segments after an
    /// optional parameter. Several optional parameters may trail the pattern.
    pub fn parse(pattern: &str) -> KeelResult<Self> {
        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();

        for raw in split(pattern) {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(inner) => {
                    let (name, optional) = match inner.strip_suffix('?') {
                        Some(name) => (name, true),
                        None => (inner, false),
                    };
                    if !is_param_name(name) {
                        return Err(invalid(pattern, &format!("bad parameter name '{name}'")));
                    }
                    if names.contains(&name) {
                        return Err(invalid(pattern, &format!("duplicate parameter '{name}'")));
                    }
                    names.push(name);
                    Segment::Param {
                        name: name.to_string(),
                        optional,
                    }
                }
                None if raw.contains(['{', '}']) => {
                    return Err(invalid(pattern, &format!("malformed segment '{raw}'")));
                }
                None => Segment::Literal(raw.to_string()),
            };

            let follows_optional = matches!(
                segments.last(),
                Some(Segment::Param { optional: true, .. })
            );
            let is_optional = matches!(segment, Segment::Param { optional: true, .. });
            if follows_optional && !is_optional {
                return Err(invalid(
                    pattern,
                    &format!("segment '{raw}' cannot follow an optional parameter"),
                ));
            }
            segments.push(segment);
        }

        Ok(Self {
            param_count: names.len(),
            segments,
        })
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns parameter names in pattern order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns `true` if the pattern declares a parameter called `name`.
    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.param_names().any(|n| n == name)
    }

    /// Matches `path` structurally and returns the captured parameters.
    ///
    /// Literals must match exactly, required parameters consume one segment,
    /// optional parameters consume one segment if one is left. The path must
    /// be fully consumed.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let mut remaining = split(path);
        let mut params = RouteParams::with_capacity(self.param_count);

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    if remaining.next()? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param {
                    name,
                    optional: false,
                } => params.push(name.as_str(), Some(remaining.next()?.to_string())),
                Segment::Param {
                    name,
                    optional: true,
                } => params.push(name.as_str(), remaining.next().map(str::to_string)),
            }
        }

        remaining.next().is_none().then_some(params)
    }

    /// Substitutes parameter values into the pattern.
    ///
    /// Values are percent-encoded so each one stays a single segment. A
    /// missing optional parameter drops its segment. A missing required
    /// parameter, or a missing optional one followed by a supplied optional,
    /// yields `Err` with the missing parameter's name.
    pub fn render<'p>(&'p self, lookup: impl Fn(&str) -> Option<&'p str>) -> Result<String, &'p str> {
        let mut path = String::new();
        let mut skipped: Option<&str> = None;
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    path.push('/');
                    path.push_str(literal);
                }
                Segment::Param { name, optional } => match (lookup(name), *optional) {
                    (Some(value), _) => {
                        if let Some(missing) = skipped {
                            return Err(missing);
                        }
                        path.push('/');
                        path.push_str(&urlencoding::encode(value));
                    }
                    (None, true) => skipped = skipped.or(Some(name.as_str())),
                    (None, false) => return Err(name.as_str()),
                },
            }
        }

        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Joins path fragments, collapsing redundant slashes.
///
/// ```rust
/// assert_eq!(keel_router::pattern::join(["/admin/", "/users", "{id}"]), "/admin/users/{id}");
/// assert_eq!(keel_router::pattern::join(["/", ""]), "/");
/// ```
pub fn join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let joined = parts
        .into_iter()
        .flat_map(split)
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid(pattern: &str, reason: &str) -> KeelError {
    KeelError::configuration(format!("invalid route pattern '{pattern}': {reason}"))
}
