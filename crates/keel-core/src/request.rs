//! The request contract consumed by the dispatch core.
//!
//! A [`Request`] is an already-parsed HTTP request: method, URI, headers,
//! query parameters, body parameters and uploaded-file references. The router,
//! pipeline and kernel only read these; the one mutable part is
//! [`Request::extensions_mut`], which middleware and the kernel use to attach
//! request-scoped data.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};

use crate::{KeelError, KeelResult};

/// Content type of URL-encoded form bodies.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Reference to an uploaded file that has already been spooled somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was submitted under.
    pub field: String,
    /// Original client-side file name.
    pub file_name: String,
    /// Declared content type.
    pub content_type: Option<String>,
    /// Where the upload was stored.
    pub temp_path: std::path::PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// An incoming HTTP request.
///
/// # Example
///
/// ```
/// use keel_core::Request;
/// use http::Method;
///
/// let request = Request::builder()
///     .method(Method::GET)
///     .uri("/posts?page=2")
///     .header("accept", "text/html")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.path(), "/posts");
/// assert_eq!(request.query("page"), Some("2"));
/// assert_eq!(request.header("accept"), Some("text/html"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: HashMap<String, String>,
    input: HashMap<String, String>,
    files: Vec<UploadedFile>,
    body: Bytes,
    extensions: Extensions,
}

impl Request {
    /// Creates a new request builder.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Converts an `http::Request` whose body has been fully read.
    ///
    /// Query parameters are decoded from the URI; URL-encoded form bodies are
    /// decoded into body parameters.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let query = parse_query(&parts.uri);

        let is_form = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(FORM_CONTENT_TYPE));
        let input = if is_form {
            url::form_urlencoded::parse(&body).into_owned().collect()
        } else {
            HashMap::new()
        };

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            query,
            input,
            files: Vec::new(),
            body,
            extensions: parts.extensions,
        }
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the full request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Looks up a header by name, ignoring values that are not valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a query string parameter.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns all query string parameters.
    #[must_use]
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Returns a body parameter.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&str> {
        self.input.get(name).map(String::as_str)
    }

    /// Returns all body parameters.
    #[must_use]
    pub fn input_params(&self) -> &HashMap<String, String> {
        &self.input
    }

    /// Returns the uploaded files.
    #[must_use]
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Returns the first uploaded file submitted under `field`.
    #[must_use]
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the request extensions.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the request extensions mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Builder for [`Request`].
///
/// Errors (invalid URI or header) are deferred to [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: Result<Uri, String>,
    headers: HeaderMap,
    input: HashMap<String, String>,
    files: Vec<UploadedFile>,
    body: Bytes,
    error: Option<String>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Creates a builder for `GET /`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            uri: Ok(Uri::from_static("/")),
            headers: HeaderMap::new(),
            input: HashMap::new(),
            files: Vec::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI (path plus optional query string).
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.parse::<Uri>().map_err(|e| format!("invalid URI '{uri}': {e}"));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => {
                self.error
                    .get_or_insert_with(|| format!("invalid header '{name}: {value}'"));
            }
        }
        self
    }

    /// Adds a body parameter.
    #[must_use]
    pub fn input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.input.insert(name.into(), value.into());
        self
    }

    /// Adds an uploaded-file reference.
    #[must_use]
    pub fn file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the request.
    pub fn build(self) -> KeelResult<Request> {
        if let Some(error) = self.error {
            return Err(KeelError::configuration(error));
        }
        let uri = self.uri.map_err(KeelError::configuration)?;
        let query = parse_query(&uri);

        Ok(Request {
            method: self.method,
            uri,
            headers: self.headers,
            query,
            input: self.input,
            files: self.files,
            body: self.body,
            extensions: Extensions::new(),
        })
    }
}
