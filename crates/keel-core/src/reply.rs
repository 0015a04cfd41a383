//! Values a terminal handler may produce.
//!
//! Handlers return a [`Reply`]; the kernel coerces it to a [`Response`]:
//! responses pass through untouched, text becomes HTML, and structured data is
//! serialized to JSON only for routes marked as API routes.

use serde::Serialize;

use crate::{KeelError, KeelResult, Response};

/// A response-coercible handler result.
#[derive(Debug)]
pub enum Reply {
    /// A fully-formed response, passed through unchanged.
    Response(Response),
    /// Markup or text, rendered as an HTML response.
    Html(String),
    /// Structured data, serialized to JSON for API routes only.
    Data(serde_json::Value),
}

impl Reply {
    /// Serializes `value` into a [`Reply::Data`].
    pub fn data<T: Serialize>(value: &T) -> KeelResult<Self> {
        serde_json::to_value(value)
            .map(Self::Data)
            .map_err(|e| KeelError::handler_with_source("failed to serialize reply", e))
    }

    /// Returns a short label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Response(_) => "response",
            Self::Html(_) => "html",
            Self::Data(_) => "data",
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Self::Html(body)
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Self::Html(body.to_string())
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Self::Data(value)
    }
}
