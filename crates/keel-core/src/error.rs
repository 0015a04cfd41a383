//! Error types for Keel.
//!
//! This module provides the [`KeelError`] type, the single error type that
//! flows through the container, router, pipeline and kernel.
//!
//! Every layer below the kernel returns `Err(KeelError)` instead of recovering;
//! the kernel is the only place where an error is turned into a response.
//!
//! | Variant | Category | Status |
//! |---|---|---|
//! | `Configuration` | `Configuration` | 500 |
//! | `UnboundKey` | `Container` | 500 |
//! | `UnresolvableDependency` | `Container` | 500 |
//! | `CircularDependency` | `Container` | 500 |
//! | `NotInstantiable` | `Container` | 500 |
//! | `NotFound` | `NotFound` | 404 |
//! | `Handler` | `Handler` | explicit or 500 |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`KeelError`].
pub type KeelResult<T> = Result<T, KeelError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad wiring detected at composition or resolution time.
    Configuration,
    /// Dependency container resolution failures.
    Container,
    /// No route matched the request.
    NotFound,
    /// Failures raised by handler or middleware business logic.
    Handler,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Configuration | Self::Container | Self::Handler => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the snake_case name used in envelopes, logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Container => "container",
            Self::NotFound => "not_found",
            Self::Handler => "handler",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for Keel.
///
/// # Example
///
/// ```
/// use keel_core::{KeelError, ErrorCategory};
///
/// let err = KeelError::not_found("GET", "/missing");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum KeelError {
    /// Invalid wiring: bad middleware reference, invalid route definition,
    /// structured reply from a non-API route, and similar.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// Nothing is bound to the key and it is not directly constructible.
    #[error("No binding registered for '{key}'")]
    UnboundKey {
        /// The key that was requested.
        key: String,
    },

    /// A constructor parameter could neither be resolved nor defaulted.
    #[error("Unresolvable dependency '{parameter}' while constructing {owner}")]
    UnresolvableDependency {
        /// The constructor parameter name.
        parameter: String,
        /// The type being constructed.
        owner: String,
    },

    /// Resolution re-entered a key already on the resolution path.
    #[error("Circular dependency detected: {}", path.join(" -> "))]
    CircularDependency {
        /// The resolution path, ending with the repeated key.
        path: Vec<String>,
    },

    /// A binding points at a type that cannot be constructed.
    #[error("Type {type_name} is not instantiable")]
    NotInstantiable {
        /// The offending type or key.
        type_name: String,
    },

    /// No route matched the request.
    #[error("No route matches {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// Handler or middleware failure.
    #[error("Handler error: {message}")]
    Handler {
        /// Human-readable error message.
        message: String,
        /// Status to report, when the failure carries one.
        status: Option<StatusCode>,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl KeelError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an unbound key error.
    #[must_use]
    pub fn unbound(key: impl ToString) -> Self {
        Self::UnboundKey {
            key: key.to_string(),
        }
    }

    /// Creates an unresolvable dependency error.
    #[must_use]
    pub fn unresolvable(parameter: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::UnresolvableDependency {
            parameter: parameter.into(),
            owner: owner.into(),
        }
    }

    /// Creates a not-instantiable error.
    #[must_use]
    pub fn not_instantiable(type_name: impl ToString) -> Self {
        Self::NotInstantiable {
            type_name: type_name.to_string(),
        }
    }

    /// Creates a not found error for a request.
    #[must_use]
    pub fn not_found(method: impl ToString, path: impl Into<String>) -> Self {
        Self::NotFound {
            method: method.to_string(),
            path: path.into(),
        }
    }

    /// Creates a handler failure with a message.
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates a handler failure that should be reported with `status`.
    #[must_use]
    pub fn handler_with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Creates a handler failure wrapping an underlying error.
    #[must_use]
    pub fn handler_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Handler {
            message: message.into(),
            status: None,
            source: Some(source.into()),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::UnboundKey { .. }
            | Self::UnresolvableDependency { .. }
            | Self::CircularDependency { .. }
            | Self::NotInstantiable { .. } => ErrorCategory::Container,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Handler { .. } => ErrorCategory::Handler,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Handler {
                status: Some(status),
                ..
            } => *status,
            _ => self.category().default_status_code(),
        }
    }

    /// Returns `true` when a resolution attempt simply found nothing usable,
    /// so a parameter default may stand in.
    ///
    /// Cycles are never a miss.
    #[must_use]
    pub const fn is_resolution_miss(&self) -> bool {
        matches!(
            self,
            Self::UnboundKey { .. }
                | Self::NotInstantiable { .. }
                | Self::UnresolvableDependency { .. }
        )
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// When `verbose` is false, server-side failures carry only a generic
    /// message.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>, verbose: bool) -> ErrorEnvelope {
        let message = if verbose || !self.status_code().is_server_error() {
            self.to_string()
        } else {
            "An internal error occurred".to_string()
        };

        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                category: self.category(),
                details: if verbose { self.error_details() } else { None },
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::UnboundKey { .. } => "UNBOUND_KEY",
            Self::UnresolvableDependency { .. } => "UNRESOLVABLE_DEPENDENCY",
            Self::CircularDependency { .. } => "CIRCULAR_DEPENDENCY",
            Self::NotInstantiable { .. } => "NOT_INSTANTIABLE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Handler { .. } => "HANDLER_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::UnresolvableDependency { parameter, owner } => Some(serde_json::json!({
                "parameter": parameter,
                "owner": owner
            })),
            Self::CircularDependency { path } => Some(serde_json::json!({ "path": path })),
            Self::NotFound { method, path } => Some(serde_json::json!({
                "method": method,
                "path": path
            })),
            Self::Handler {
                source: Some(source),
                ..
            } => Some(serde_json::json!({ "source": format!("{source:#}") })),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for KeelError {
    fn from(err: anyhow::Error) -> Self {
        Self::Handler {
            message: err.to_string(),
            status: None,
            source: Some(err),
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error details within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details, only present in verbose mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = KeelError::not_found("GET", "/nope");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No route matches GET /nope");
    }

    #[test]
    fn test_category_names_match_serde() {
        for category in [
            ErrorCategory::Configuration,
            ErrorCategory::Container,
            ErrorCategory::NotFound,
            ErrorCategory::Handler,
        ] {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, category.as_str());
        }
    }

    #[test]
    fn test_container_errors_are_server_errors() {
        let errors = [
            KeelError::unbound("Database"),
            KeelError::unresolvable("dsn", "Database"),
            KeelError::not_instantiable("dyn Repository"),
            KeelError::CircularDependency {
                path: vec!["A".into(), "B".into(), "A".into()],
            },
        ];

        for err in &errors {
            assert_eq!(err.category(), ErrorCategory::Container);
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_circular_dependency_display() {
        let err = KeelError::CircularDependency {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: A -> B -> A");
    }

    #[test]
    fn test_handler_explicit_status() {
        let err = KeelError::handler_with_status(StatusCode::FORBIDDEN, "nope");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.category(), ErrorCategory::Handler);
    }

    #[test]
    fn test_resolution_miss() {
        assert!(KeelError::unbound("x").is_resolution_miss());
        assert!(!KeelError::CircularDependency { path: vec![] }.is_resolution_miss());
        assert!(!KeelError::configuration("x").is_resolution_miss());
    }

    #[test]
    fn test_envelope_hides_internal_details() {
        let err = KeelError::handler_with_source("db down", anyhow::anyhow!("connection refused"));
        let envelope = err.to_envelope(Some("req-1"), false);
        assert_eq!(envelope.error.code, "HANDLER_ERROR");
        assert_eq!(envelope.error.message, "An internal error occurred");
        assert!(envelope.error.details.is_none());

        let verbose = err.to_envelope(Some("req-1"), true);
        assert!(verbose.error.message.contains("db down"));
        assert!(verbose.error.details.is_some());
    }

    #[test]
    fn test_envelope_serialization() {
        let err = KeelError::not_found("GET", "/x");
        let json = serde_json::to_value(err.to_envelope(None, false)).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["category"], "not_found");
        assert!(json.get("request_id").is_none());
    }

    #[test]
    fn test_from_anyhow() {
        let err: KeelError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, KeelError::Handler { .. }));
        assert_eq!(err.to_string(), "Handler error: boom");
    }
}
