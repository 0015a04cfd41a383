//! Logging and metrics for the Keel dispatch kernel.
//!
//! Keel instruments itself with [`tracing`] and the [`metrics`] facade. This
//! crate wires those up:
//!
//! - **Logging**: a `tracing-subscriber` formatter (JSON, pretty or compact)
//!   filtered through an `EnvFilter`
//! - **Metrics**: names and recording helpers for dispatch counters and
//!   latency histograms. No exporter is installed here; applications pick
//!   their own recorder.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `keel_dispatch_total` | Counter | `route`, `status` | Dispatched requests |
//! | `keel_dispatch_duration_seconds` | Histogram | `route` | Dispatch latency |
//! | `keel_dispatch_failures_total` | Counter | `category` | Failed dispatches by error category |
//!
//! # Example
//!
//! ```rust,no_run
//! use keel_telemetry::{init_logging, LogConfig, LogFormat};
//!
//! let config = LogConfig {
//!     level: "keel=debug,info".to_string(),
//!     format: LogFormat::Pretty,
//!     ..LogConfig::default()
//! };
//! init_logging(&config).unwrap();
//!
//! tracing::info!(route = "users.show", "dispatching");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};
pub use metrics::{describe_metrics, record_dispatch, record_failure};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
