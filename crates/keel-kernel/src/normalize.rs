//! Reply normalization.

use keel_core::{KeelError, KeelResult, Reply, Response, ResponseExt};

/// Converts a handler's [`Reply`] into a response.
///
/// - a response passes through untouched
/// - text becomes a `200 OK` HTML response
/// - structured data becomes JSON on API routes and is a configuration
///   error everywhere else
pub fn normalize(reply: Reply, api: bool) -> KeelResult<Response> {
    match reply {
        Reply::Response(response) => Ok(response),
        Reply::Html(body) => Ok(Response::html(body)),
        Reply::Data(value) if api => Ok(Response::json(&value)),
        Reply::Data(_) => Err(KeelError::configuration(
            "handler returned structured data from a route that is not marked as an API route",
        )),
    }
}
