//! # Keel Middleware
//!
//! Onion-style middleware composition for the Keel dispatch kernel.
//!
//! Middleware wrap everything after them in the chain. Composition starts at
//! the terminal handler and wraps it right to left, so middleware run left to
//! right on the way in and right to left on the way out:
//!
//! ```text
//! Request → RequestId → Auth → ... → terminal
//!                                       ↓
//! Response ← RequestId ← Auth ← ... ←───┘
//! ```
//!
//! Any middleware may short-circuit by returning a response without calling
//! [`Next::run`]; the response still flows back out through the middleware
//! that already ran.
//!
//! ## Key Types
//!
//! - [`Middleware`] - The calling contract `process(request, next)`
//! - [`Next`] - The rest of the chain
//! - [`MiddlewareRef`] - A named, inline or instance reference to middleware
//! - [`Pipeline`] - Resolves references (expanding middleware groups) and composes chains
//! - [`MiddlewareRegistry`] - Registers named middleware in the container
//!
//! ## Example
//!
//! ```
//! use keel_core::{Container, Request, Response, ResponseExt};
//! use keel_middleware::{MiddlewareRef, Next, RequestIdMiddleware, REQUEST_ID_HEADER};
//!
//! # tokio_test::block_on(async {
//! let chain = keel_middleware::compose(
//!     &Container::new(),
//!     &[MiddlewareRef::instance(RequestIdMiddleware::new())],
//!     Next::terminal(|_req| async { Ok(Response::html("hello")) }),
//! )
//! .unwrap();
//!
//! let response = chain.run(Request::builder().build().unwrap()).await.unwrap();
//! assert!(response.headers().contains_key(REQUEST_ID_HEADER));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/keel-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod reference;
pub mod registry;
pub mod stages;

// Re-export main types at crate root
pub use middleware::{FnMiddleware, Middleware, Next, Terminal};
pub use pipeline::{compose, Pipeline, PipelineBuilder};
pub use reference::MiddlewareRef;
pub use registry::MiddlewareRegistry;
pub use stages::{RequestIdMiddleware, SetHeaderMiddleware, REQUEST_ID_HEADER};
