//! # Keel
//!
//! **An MVC request-dispatch kernel**
//!
//! Keel takes a request, finds the route that owns it, runs it through an
//! onion of middleware and hands it to a handler whose dependencies come from
//! a service container. Whatever the handler returns is normalized into a
//! response, and every failure is rendered exactly once.
//!
//! - **Container**: typed and named bindings, singletons, aliases,
//!   autowiring and per-request scopes
//! - **Router**: ordered pattern matching with constraints, optional
//!   segments, groups and named-route URL generation
//! - **Middleware**: `Next`-style onion chains with named references and groups
//! - **Kernel**: the dispatch state machine tying it all together
//!
//! ## Quick Start
//!
//! ```rust
//! use keel::prelude::*;
//!
//! # async fn run() -> KeelResult<()> {
//! let kernel = Kernel::builder()
//!     .middleware("request_id")
//!     .routes(|routes| {
//!         routes
//!             .get(
//!                 "/hello/{name}",
//!                 Handler::inline(|_req: Request, params: RouteParams| async move {
//!                     let name = params.get("name").unwrap_or("world").to_string();
//!                     KeelResult::Ok(format!("<h1>Hello, {name}</h1>"))
//!                 }),
//!             )
//!             .name("hello");
//!     })
//!     .build()?;
//!
//! let response = kernel
//!     .handle(Request::builder().uri("/hello/ada").build()?)
//!     .await;
//! assert_eq!(response.status(), 200);
//! # Ok(())
//! # }
//! ```
//!
//! ## Dispatch
//!
//! ```text
//! Request → match route → compose middleware → resolve handler
//!                                                     ↓
//! Response ← normalize reply ← handler ← middleware ──┘
//! ```

#![doc(html_root_url = "https://docs.rs/keel/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use keel_core as core;

// Re-export middleware types
pub use keel_middleware as middleware;

// Re-export router types
pub use keel_router as router;

// Re-export the dispatch kernel
pub use keel_kernel as kernel;

// Re-export configuration
pub use keel_config as config;

// Re-export logging and metrics
pub use keel_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use keel::prelude::*;
///
/// let mut container = Container::new();
/// container.instance(std::sync::Arc::new(String::from("keel")));
/// assert!(container.has_type::<String>());
/// ```
pub mod prelude {
    pub use keel_core::{
        BoxFuture, Container, Controller, CurrentRoute, Handler, Injectable, KeelError,
        KeelResult, Key, Reply, Request, RequestId, Resolver, Response, ResponseExt, RouteParams,
    };

    // Re-export middleware types
    pub use keel_middleware::{
        Middleware, MiddlewareRef, MiddlewareRegistry, Next, RequestIdMiddleware,
        SetHeaderMiddleware,
    };

    // Re-export routing types
    pub use keel_router::{GroupAttributes, RouteRegistrar, RouteTable};

    // Re-export kernel types
    pub use keel_kernel::{
        DefaultRenderer, Dispatch, ErrorContext, ExceptionRenderer, Kernel, KernelBuilder, Phase,
    };

    // Re-export configuration
    pub use keel_config::{ConfigLoader, KeelConfig};

    // Re-export logging setup
    pub use keel_telemetry::{init_logging, LogConfig, LogFormat};
}
