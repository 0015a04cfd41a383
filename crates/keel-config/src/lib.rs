//! Typed, layered configuration for Keel.
//!
//! - TOML and JSON configuration files
//! - `.env` files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//!
//! # Example
//!
//! ```no_run
//! use keel_config::ConfigLoader;
//!
//! # fn main() -> Result<(), keel_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("keel.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("KEEL")
//!     .load()?;
//!
//! println!("debug mode: {}", config.kernel.debug);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [kernel]
//! debug = false
//! json_errors = false
//! trust_request_id = false
//! middleware = ["request_id"]
//!
//! [kernel.middleware_groups]
//! web = ["session", "csrf"]
//! api = ["throttle"]
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values are overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `KEEL__KERNEL__DEBUG=true`
//! - `KEEL__KERNEL__MIDDLEWARE=request_id,audit`
//! - `KEEL__KERNEL__MIDDLEWARE_GROUPS__WEB=session,csrf`
//! - `KEEL__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
