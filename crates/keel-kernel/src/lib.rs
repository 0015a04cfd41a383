//! Request dispatch kernel for Keel.
//!
//! The kernel turns a [`Request`](keel_core::Request) into a
//! [`Response`](keel_core::Response):
//!
//! 1. match the request against the [`RouteTable`](keel_router::RouteTable)
//! 2. resolve global and route middleware through a request-scoped
//!    [`Container`](keel_core::Container)
//! 3. resolve the route's handler
//! 4. run the middleware chain around the handler
//! 5. normalize the handler's [`Reply`](keel_core::Reply)
//!
//! Any failure is rendered exactly once by the [`ExceptionRenderer`].
//!
//! # Example
//!
//! ```
//! use keel_core::{Handler, KeelResult, Request, RouteParams};
//! use keel_kernel::Kernel;
//! use keel_middleware::SetHeaderMiddleware;
//!
//! # tokio_test::block_on(async {
//! let kernel = Kernel::builder()
//!     .middleware(keel_middleware::MiddlewareRef::instance(
//!         SetHeaderMiddleware::new("x-frame-options", "DENY").unwrap(),
//!     ))
//!     .routes(|routes| {
//!         routes.get(
//!             "/users/{id}",
//!             Handler::inline(|_req: Request, params: RouteParams| async move {
//!                 KeelResult::Ok(format!("user {}", params.get("id").unwrap_or_default()))
//!             }),
//!         );
//!     })
//!     .build()
//!     .unwrap();
//!
//! let response = kernel
//!     .handle(Request::builder().uri("/users/7").build().unwrap())
//!     .await;
//! assert_eq!(response.headers()["x-frame-options"], "DENY");
//! # });
//! ```

#![warn(missing_docs)]

mod kernel;
mod normalize;
mod phase;
mod renderer;

pub use kernel::{Dispatch, Kernel, KernelBuilder, REQUEST_ID_MIDDLEWARE};
pub use normalize::normalize;
pub use phase::Phase;
pub use renderer::{DefaultRenderer, ErrorContext, ExceptionRenderer};
