//! # Keel Core
//!
//! Core contracts shared by every Keel crate.
//!
//! This crate provides:
//!
//! - [`Container`] - Dependency container with autowiring through [`Injectable`]
//! - [`Request`] / [`Response`] - The request value the kernel consumes and the response it produces
//! - [`Handler`] / [`Controller`] - Terminal handler contracts
//! - [`Reply`] - Response-coercible handler results
//! - [`RouteParams`] - Ordered route parameters
//! - [`KeelError`] - The error taxonomy, with categories and HTTP status codes
//! - [`RequestId`] / [`CurrentRoute`] - Request-scoped context values

#![doc(html_root_url = "https://docs.rs/keel-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod container;
mod context;
mod error;
pub mod handler;
mod params;
mod reply;
mod request;
mod response;

pub use container::{Container, Factory, Injectable, Instance, Key, Producer, Resolver};
pub use context::{CurrentRoute, RequestId};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, KeelError, KeelResult};
pub use handler::{BoxFuture, Controller, Handler, HandlerFn};
pub use params::RouteParams;
pub use reply::Reply;
pub use request::{Request, RequestBuilder, UploadedFile};
pub use response::{
    Response, ResponseExt, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE,
};
