//! Built-in middleware.
//!
//! - [`request_id`] - Generate or propagate the request ID
//! - [`set_header`] - Set a fixed response header

pub mod request_id;
pub mod set_header;

pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
pub use set_header::SetHeaderMiddleware;
