//! Route table and matcher for the Keel dispatch kernel.
//!
//! Routes are declared on a [`RouteRegistrar`], optionally inside nested
//! groups that share a path prefix, middleware, a name prefix and the API
//! flag. [`RouteRegistrar::build`] validates every definition and produces an
//! immutable [`RouteTable`] that is matched by linear scan in registration
//! order.
//!
//! # Features
//!
//! - **Path Parameters**: required `{id}` and trailing optional `{page?}` segments
//! - **Constraints**: per-parameter regular expressions, fully anchored
//! - **Groups**: composable prefix, middleware, name prefix and API flag
//! - **Named Routes**: reverse URL generation with query-string overflow
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use keel_router::{GroupAttributes, RouteRegistrar};
//!
//! let mut routes = RouteRegistrar::new();
//! routes.get("/users/{id}", "UserController@show").name("users.show").where_number(&["id"]);
//! routes.group(GroupAttributes::new().prefix("/api").api(), |routes| {
//!     routes.get("/posts/{page?}", "PostController@index").name("api.posts");
//! });
//!
//! let table = routes.build().unwrap();
//!
//! let matched = table.match_route(&Method::GET, "/users/123").unwrap();
//! assert_eq!(matched.param("id"), Some("123"));
//!
//! let matched = table.match_route(&Method::GET, "/api/posts").unwrap();
//! assert!(matched.route.is_api());
//! assert_eq!(matched.param("page"), None);
//!
//! assert!(table.match_route(&Method::GET, "/users/abc").is_err());
//! assert_eq!(table.url("users.show", &[("id", "5")]).unwrap(), "/users/5");
//! ```

#![doc(html_root_url = "https://docs.rs/keel-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod pattern;
mod registrar;
mod route;
mod table;

pub use pattern::{Pattern, Segment};
pub use registrar::{GroupAttributes, RouteHandle, RouteRegistrar, ALPHA, NUMBER, SLUG};
pub use route::{Route, RouteMatch};
pub use table::RouteTable;
